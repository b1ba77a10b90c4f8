pub mod file_feed;
pub mod otter;
pub mod vendus;

use async_trait::async_trait;

use crate::error::{FeedError, IntegrationError};
use crate::models::{
    Client, ClientQuery, CreatedInvoice, FeedEntry, InvoiceRequest, InvoiceSummary, NewClient,
};

pub use file_feed::FileOrderFeed;
pub use otter::{OtterClient, OtterOrderFeed};
pub use vendus::{DocumentConfig, VendusClient};

/// Invoicing service boundary. Every method fails with a distinguishable
/// `IntegrationError::Http` on non-2xx responses.
#[async_trait]
pub trait Invoicer: Send + Sync {
    async fn search_clients(&self, query: &ClientQuery) -> Result<Vec<Client>, IntegrationError>;

    async fn create_client(&self, client: &NewClient) -> Result<Client, IntegrationError>;

    async fn create_invoice(&self, request: &InvoiceRequest)
        -> Result<CreatedInvoice, IntegrationError>;

    /// Printable receipt payload.
    async fn get_receipt(&self, invoice_id: i64) -> Result<Vec<u8>, IntegrationError>;

    async fn list_invoices(&self) -> Result<Vec<InvoiceSummary>, IntegrationError>;
}

/// Source of the current ticket snapshot.
#[async_trait]
pub trait OrderFeed: Send + Sync {
    async fn fetch_tickets(&self) -> Result<Vec<FeedEntry>, FeedError>;
}
