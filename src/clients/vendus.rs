use async_trait::async_trait;
use base64::Engine;
use bigdecimal::BigDecimal;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::clients::Invoicer;
use crate::error::IntegrationError;
use crate::models::{
    money, Client, ClientQuery, CreatedInvoice, InvoiceRequest, InvoiceSummary, NewClient,
};

pub const DEFAULT_BASE_URL: &str = "https://www.vendus.pt/ws/v1.1";

/// Fixed document fields sent with every delivery invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Document type, e.g. `"FR"` (invoice-receipt).
    pub document_type: String,
    pub payment_id: String,
    pub register_id: i64,
}

/// Vendus-backed invoicer.
///
/// API key is passed in by the caller; do not log it.
#[derive(Debug, Clone)]
pub struct VendusClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
    document: DocumentConfig,
}

#[derive(Serialize)]
struct PaymentRef<'a> {
    id: &'a str,
}

#[derive(Serialize)]
struct ClientRef {
    id: i64,
}

#[derive(Serialize)]
struct DocumentItem<'a> {
    reference: &'a str,
    qty: u32,
    #[serde(serialize_with = "money::serialize")]
    gross_price: BigDecimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Serialize)]
struct DocumentBody<'a> {
    #[serde(rename = "type")]
    document_type: &'a str,
    register_id: i64,
    payments: Vec<PaymentRef<'a>>,
    items: Vec<DocumentItem<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client: Option<ClientRef>,
    external_reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}

#[derive(Deserialize)]
struct ReceiptResource {
    output: String,
}

impl VendusClient {
    pub fn new(api_key: String, document: DocumentConfig) -> Self {
        Self::new_with_base_url(api_key, DEFAULT_BASE_URL.to_string(), document)
    }

    pub fn new_with_base_url(api_key: String, base_url: String, document: DocumentConfig) -> Self {
        Self {
            api_key,
            http: reqwest::Client::new(),
            base_url,
            document,
        }
    }

    fn clients_url(&self) -> String {
        format!("{}/clients/", self.base_url.trim_end_matches('/'))
    }

    fn documents_url(&self) -> String {
        format!("{}/documents/", self.base_url.trim_end_matches('/'))
    }

    fn document_url(&self, invoice_id: i64) -> String {
        format!("{}/documents/{}", self.base_url.trim_end_matches('/'), invoice_id)
    }

    /// Non-2xx becomes `IntegrationError::Http` carrying the response body.
    async fn check(resp: Response) -> Result<Response, IntegrationError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        tracing::warn!("invoicer http error status={} body={}", status.as_u16(), body);
        Err(IntegrationError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Invoicer for VendusClient {
    async fn search_clients(&self, query: &ClientQuery) -> Result<Vec<Client>, IntegrationError> {
        let (field, value) = match query {
            ClientQuery::FiscalId(v) => ("fiscal_id", v),
            ClientQuery::ExternalReference(v) => ("external_reference", v),
            ClientQuery::Name(v) => ("name", v),
        };

        let resp = self
            .http
            .get(self.clients_url())
            .query(&[("api_key", self.api_key.as_str()), (field, value.as_str())])
            .send()
            .await?;

        // no matches is reported as 404
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        Ok(Self::check(resp).await?.json().await?)
    }

    async fn create_client(&self, client: &NewClient) -> Result<Client, IntegrationError> {
        let resp = self
            .http
            .post(self.clients_url())
            .query(&[("api_key", self.api_key.as_str())])
            .json(client)
            .send()
            .await?;

        Ok(Self::check(resp).await?.json().await?)
    }

    async fn create_invoice(
        &self,
        request: &InvoiceRequest,
    ) -> Result<CreatedInvoice, IntegrationError> {
        let body = DocumentBody {
            document_type: &self.document.document_type,
            register_id: self.document.register_id,
            payments: vec![PaymentRef {
                id: &self.document.payment_id,
            }],
            items: request
                .lines
                .iter()
                .map(|line| DocumentItem {
                    reference: &line.reference,
                    qty: line.quantity,
                    gross_price: line.price.clone(),
                    text: line.note.as_deref(),
                })
                .collect(),
            client: request.client_id.map(|id| ClientRef { id }),
            external_reference: &request.external_reference,
            notes: request.notes.as_deref(),
        };

        let resp = self
            .http
            .post(self.documents_url())
            .query(&[("api_key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        Ok(Self::check(resp).await?.json().await?)
    }

    async fn get_receipt(&self, invoice_id: i64) -> Result<Vec<u8>, IntegrationError> {
        let resp = self
            .http
            .get(self.document_url(invoice_id))
            .query(&[("api_key", self.api_key.as_str()), ("output", "escpos")])
            .send()
            .await?;

        let resource: ReceiptResource = Self::check(resp).await?.json().await?;

        base64::engine::general_purpose::STANDARD
            .decode(resource.output.as_bytes())
            .map_err(|e| IntegrationError::Decode(format!("receipt base64: {}", e)))
    }

    async fn list_invoices(&self) -> Result<Vec<InvoiceSummary>, IntegrationError> {
        let resp = self
            .http
            .get(self.documents_url())
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        Ok(Self::check(resp).await?.json().await?)
    }
}
