use anyhow::{Context, Result};
use axum::{
    Router, middleware,
    routing::{get, post},
};

use anchorline_core::Anchorline;

mod cors;
mod dto;
mod error;
mod handlers;

#[cfg(test)]
mod tests;

#[derive(Clone)]
pub(crate) struct WebState {
    pub(crate) app: Anchorline,
}

impl WebState {
    fn new(app: Anchorline) -> Self {
        Self { app }
    }
}

/// Start the tracker HTTP server and block until shutdown.
///
/// # Errors
/// Returns an error when the runtime cannot be created, the socket
/// cannot be bound, or the server exits with a runtime failure.
pub fn serve_web(app: Anchorline, host: &str, port: u16) -> Result<()> {
    let state = WebState::new(app);
    let bind_addr = format!("{host}:{port}");
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build web runtime")?;

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("failed to bind tracker server at {bind_addr}"))?;
        tracing::info!(addr = %listener.local_addr()?, "anchorline tracker listening");

        axum::serve(listener, app_router(state))
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
            .context("tracker server failed")
    })
}

pub(crate) fn app_router(state: WebState) -> Router {
    Router::new()
        .route("/checkin", post(handlers::check_in))
        .route("/checkout", post(handlers::check_out))
        .route("/tap", post(handlers::smart_tap))
        .route("/sessions", get(handlers::list_sessions))
        .layer(middleware::from_fn(cors::open_cors_middleware))
        .with_state(state)
}
