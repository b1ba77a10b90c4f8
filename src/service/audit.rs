use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashSet;

use crate::clients::Invoicer;
use crate::db::queries;
use crate::error::ReconcileError;
use crate::models::InvoiceSummary;

/// Invoices known to the invoicer but missing from the ledger.
///
/// A delivery invoice listed here was issued upstream but never recorded,
/// e.g. the process was killed between creation and ledger insert. The poll
/// loop would invoice that ticket again, so an operator has to reconcile it.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub ledger_rows: usize,
    pub unrecorded_deliveries: Vec<InvoiceSummary>,
    /// Second invoice for a ticket whose code is already in the ledger.
    pub duplicate_deliveries: Vec<InvoiceSummary>,
    pub unrecorded_manual: Vec<InvoiceSummary>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.unrecorded_deliveries.is_empty() && self.duplicate_deliveries.is_empty()
    }
}

/// Read-only comparison of the ledger with the invoicer's listing.
pub async fn audit_ledger(
    pool: &SqlitePool,
    invoicer: &dyn Invoicer,
) -> Result<AuditReport, ReconcileError> {
    let entries = queries::list_invoices(pool).await?;
    let codes = queries::list_delivery_codes(pool).await?;
    let ids: HashSet<i64> = entries.iter().map(|e| e.id).collect();

    let mut report = AuditReport {
        ledger_rows: entries.len(),
        unrecorded_deliveries: Vec::new(),
        duplicate_deliveries: Vec::new(),
        unrecorded_manual: Vec::new(),
    };

    for invoice in invoicer.list_invoices().await? {
        if ids.contains(&invoice.id) {
            continue;
        }
        let code_in_ledger = invoice.is_delivery().then(|| {
            invoice
                .external_reference
                .as_deref()
                .map(|code| codes.contains(code))
                .unwrap_or(false)
        });
        match code_in_ledger {
            Some(true) => report.duplicate_deliveries.push(invoice),
            Some(false) => report.unrecorded_deliveries.push(invoice),
            None => report.unrecorded_manual.push(invoice),
        }
    }

    if !report.is_clean() {
        tracing::warn!(
            "Ledger audit: {} delivery invoices missing from ledger, {} duplicated",
            report.unrecorded_deliveries.len(),
            report.duplicate_deliveries.len()
        );
    }

    Ok(report)
}
