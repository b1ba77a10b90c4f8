use crate::api::AppState;
use crate::db::queries;
use crate::service::{audit_ledger, AuditReport};
use crate::models::LedgerEntry;
use axum::{
    extract::{Json, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

/// Response body
#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    pub success: bool,
    pub message: String,
    pub invoices: Option<Vec<LedgerEntry>>,
}

/// Audit response body
#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub success: bool,
    pub message: String,
    pub report: Option<AuditReport>,
}

/// Health check
pub async fn health_check() -> &'static str {
    "OK"
}

/// Ledger rows, receipts excluded
pub async fn list_ledger(State(state): State<Arc<AppState>>) -> Response {
    match queries::list_invoices(&state.pool).await {
        Ok(invoices) => {
            let response = LedgerResponse {
                success: true,
                message: format!("{} invoices in ledger", invoices.len()),
                invoices: Some(invoices),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            let response = LedgerResponse {
                success: false,
                message: format!("Error: {}", e),
                invoices: None,
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response()
        }
    }
}

/// Ledger rows as CSV
pub async fn export_ledger_csv(State(state): State<Arc<AppState>>) -> Response {
    let invoices = match queries::list_invoices(&state.pool).await {
        Ok(invoices) => invoices,
        Err(e) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)).into_response();
        }
    };

    let mut body = Vec::new();
    match queries::export_to_csv(&invoices, &mut body) {
        Ok(()) => (StatusCode::OK, [(header::CONTENT_TYPE, "text/csv")], body).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)).into_response(),
    }
}

/// Ledger vs invoicer comparison (read-only)
pub async fn audit(State(state): State<Arc<AppState>>) -> Response {
    match audit_ledger(&state.pool, state.invoicer.as_ref()).await {
        Ok(report) => {
            let response = AuditResponse {
                success: true,
                message: if report.is_clean() {
                    "Ledger matches invoicer".to_string()
                } else {
                    format!(
                        "{} delivery invoices missing from ledger, {} duplicated",
                        report.unrecorded_deliveries.len(),
                        report.duplicate_deliveries.len()
                    )
                },
                report: Some(report),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            let response = AuditResponse {
                success: false,
                message: format!("Error: {}", e),
                report: None,
            };
            (StatusCode::BAD_GATEWAY, Json(response)).into_response()
        }
    }
}
