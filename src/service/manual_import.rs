use chrono::NaiveDate;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clients::Invoicer;
use crate::db::queries;
use crate::error::ReconcileError;

/// Imports invoices issued by hand on the invoicer (no delivery ticket) into
/// the ledger so they reach the printer too. Idempotent on invoice id.
pub struct ManualInvoiceImporter {
    pool: SqlitePool,
    invoicer: Arc<dyn Invoicer>,
}

impl ManualInvoiceImporter {
    pub fn new(pool: SqlitePool, invoicer: Arc<dyn Invoicer>) -> Self {
        Self { pool, invoicer }
    }

    /// Returns how many invoices were added. A failing invoice is logged and
    /// left for the next cycle without blocking the others; the row is only
    /// written once its receipt is in hand.
    pub async fn import(&self, today: NaiveDate) -> Result<usize, ReconcileError> {
        let invoices = self.invoicer.list_invoices().await?;
        let mut imported = 0;

        for invoice in invoices
            .iter()
            .filter(|i| i.date == today && !i.is_delivery())
        {
            if queries::was_invoice_saved(&self.pool, invoice.id).await? {
                continue;
            }

            debug!(
                "Found manual invoice {} {} {}",
                invoice.id,
                invoice.amount_gross,
                invoice.local_time.as_deref().unwrap_or("-")
            );

            let receipt = match self.invoicer.get_receipt(invoice.id).await {
                Ok(receipt) => receipt,
                Err(e) => {
                    warn!("Manual invoice {}: receipt failed, will retry: {}", invoice.id, e);
                    continue;
                }
            };
            if let Err(e) = queries::save_invoice(&self.pool, invoice.id, None, &receipt).await {
                warn!("Manual invoice {}: ledger insert failed, will retry: {}", invoice.id, e);
                continue;
            }

            info!("Imported manual invoice {}", invoice.id);
            imported += 1;
        }

        Ok(imported)
    }
}
