use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use anchorline_core::{Anchorline, AppConfig, LocationCatalog};

const HOST_ENV: &str = "ANCHORLINE_HOST";
const PORT_ENV: &str = "ANCHORLINE_PORT";

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    let catalog = LocationCatalog::from_env();
    tracing::info!(
        session_window_secs = config.session_window_secs,
        history_limit = config.history_limit,
        locations = ?catalog.ids(),
        "starting anchorline tracker"
    );

    let app = Anchorline::in_memory(&config, catalog);

    let host = std::env::var(HOST_ENV).unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = match std::env::var(PORT_ENV) {
        Ok(raw) => raw
            .trim()
            .parse::<u16>()
            .with_context(|| format!("invalid {PORT_ENV}: {raw}"))?,
        Err(_) => 8787,
    };

    anchorline_web::serve_web(app, &host, port)
}
