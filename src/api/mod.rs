pub mod handlers;

pub use handlers::*;

use crate::clients::Invoicer;
use axum::{routing::get, Router};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceBuilder;

/// Shared state of the status server
pub struct AppState {
    pub pool: SqlitePool,
    pub invoicer: Arc<dyn Invoicer>,
}

/// Read-only status routes; nothing here writes the ledger.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/ledger", get(list_ledger))
        .route("/api/ledger.csv", get(export_ledger_csv))
        .route("/api/audit", get(audit))
        .layer(ServiceBuilder::new())
        .with_state(state)
}
