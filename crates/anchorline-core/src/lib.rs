// Public fallible APIs in this crate share one concrete error contract (`AnchorlineError`).
// Repeating per-function `# Errors` boilerplate obscures behavior more than it clarifies.
#![allow(
    clippy::missing_errors_doc,
    reason = "crate-wide fallible API uses one explicit error type; per-item boilerplate would duplicate contract"
)]

pub mod catalog;
pub mod client;
pub mod config;
pub mod confidence;
pub mod engine;
pub mod error;
pub(crate) mod locks;
pub mod models;
pub mod repo;
pub mod store;

pub use catalog::LocationCatalog;
pub use client::Anchorline;
pub use config::AppConfig;
pub use confidence::ConfidenceTable;
pub use engine::{AggregationEngine, AnchorEvent, SessionAction, Transition};
pub use error::{AnchorlineError, Result};
pub use models::{Anchor, AnchorKind, SessionCandidate, SessionStatus};
pub use store::{KeyedTtlStore, MemoryTtlStore};
