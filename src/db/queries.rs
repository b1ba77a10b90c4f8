use crate::models::{InvoiceRecord, LedgerEntry};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::io::Write;

/// Whether a delivery ticket already has an invoice in the ledger.
pub async fn was_delivery_invoiced(pool: &SqlitePool, code: &str) -> Result<bool, sqlx::Error> {
    let row: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id
        FROM invoice
        WHERE delivery_code = ?1
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}

/// Whether an invoice id is already recorded.
pub async fn was_invoice_saved(pool: &SqlitePool, invoice_id: i64) -> Result<bool, sqlx::Error> {
    let row: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id
        FROM invoice
        WHERE id = ?1
        "#,
    )
    .bind(invoice_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}

/// Inserts a ledger row, unprinted. Committed immediately.
pub async fn save_invoice(
    pool: &SqlitePool,
    invoice_id: i64,
    delivery_code: Option<&str>,
    receipt: &[u8],
) -> Result<(), sqlx::Error> {
    let start_time = std::time::Instant::now();

    let result = sqlx::query(
        r#"
        INSERT INTO invoice (id, delivery_code, receipt_blob, print_status)
        VALUES (?1, ?2, ?3, NULL)
        "#,
    )
    .bind(invoice_id)
    .bind(delivery_code)
    .bind(receipt)
    .execute(pool)
    .await;

    match result {
        Ok(done) => {
            tracing::debug!(
                "INSERT invoice {} affected {} rows in {:?}",
                invoice_id,
                done.rows_affected(),
                start_time.elapsed()
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("INSERT invoice {} failed: {:?}", invoice_id, e);
            Err(e)
        }
    }
}

/// Full ledger row including the receipt payload.
pub async fn get_invoice(
    pool: &SqlitePool,
    invoice_id: i64,
) -> Result<Option<InvoiceRecord>, sqlx::Error> {
    sqlx::query_as::<_, InvoiceRecord>(
        r#"
        SELECT id, delivery_code, receipt_blob, print_status
        FROM invoice
        WHERE id = ?1
        "#,
    )
    .bind(invoice_id)
    .fetch_optional(pool)
    .await
}

/// All ledger rows without receipts, by id.
pub async fn list_invoices(pool: &SqlitePool) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    sqlx::query_as::<_, LedgerEntry>(
        r#"
        SELECT id, delivery_code, print_status
        FROM invoice
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Ids of invoices imported without a delivery ticket.
pub async fn list_manual_invoice_ids(pool: &SqlitePool) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT id
        FROM invoice
        WHERE delivery_code IS NULL
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Every delivery code present in the ledger.
pub async fn list_delivery_codes(pool: &SqlitePool) -> Result<HashSet<String>, sqlx::Error> {
    let codes = sqlx::query_scalar::<_, String>(
        r#"
        SELECT delivery_code
        FROM invoice
        WHERE delivery_code IS NOT NULL
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(codes.into_iter().collect())
}

/// Writes ledger rows as CSV (`id,delivery_code,print_status`), receipts excluded.
pub fn export_to_csv<W: Write>(
    entries: &[LedgerEntry],
    writer: W,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["id", "delivery_code", "print_status"])?;

    for entry in entries {
        writer.write_record([
            entry.id.to_string(),
            entry.delivery_code.clone().unwrap_or_default(),
            entry.print_status.clone().unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
