use serde::Serialize;
use sqlx::FromRow;

/// Ledger row (`invoice` table).
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRecord {
    /// Invoicer-assigned id.
    pub id: i64,
    /// Ticket code; `None` for manually created invoices.
    pub delivery_code: Option<String>,
    pub receipt_blob: Vec<u8>,
    /// Owned by the printing collaborator; `None` until printed.
    pub print_status: Option<String>,
}

/// Ledger row without the receipt payload, for listings and exports.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub delivery_code: Option<String>,
    pub print_status: Option<String>,
}
