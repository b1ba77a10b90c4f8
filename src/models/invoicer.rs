use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{money, StackedInvoiceLine};

/// Billing client as known by the invoicer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Client {
    pub id: i64,
    #[serde(default)]
    pub fiscal_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
}

/// Client search criteria, one field at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientQuery {
    FiscalId(String),
    ExternalReference(String),
    Name(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewClient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiscal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
}

/// Everything needed to issue one delivery invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceRequest {
    pub lines: Vec<StackedInvoiceLine>,
    /// `None` invoices the final consumer.
    pub client_id: Option<i64>,
    /// Ticket code.
    pub external_reference: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedInvoice {
    pub id: i64,
    #[serde(deserialize_with = "money::deserialize")]
    pub amount_gross: BigDecimal,
}

/// One row of the invoicer's document listing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvoiceSummary {
    pub id: i64,
    pub date: NaiveDate,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(deserialize_with = "money::deserialize", serialize_with = "money::serialize")]
    pub amount_gross: BigDecimal,
    #[serde(default)]
    pub local_time: Option<String>,
}

impl InvoiceSummary {
    /// Delivery invoices carry the ticket code as external reference.
    pub fn is_delivery(&self) -> bool {
        self.external_reference
            .as_deref()
            .map(|r| !r.trim().is_empty())
            .unwrap_or(false)
    }
}
