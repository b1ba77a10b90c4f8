#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{Local, NaiveDate};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use delivery_invoicing::clients::{Invoicer, OrderFeed};
use delivery_invoicing::error::{FeedError, IntegrationError};
use delivery_invoicing::models::{
    lines_total, Client, ClientQuery, CreatedInvoice, FeedEntry, InvoiceRequest, InvoiceSummary,
    NewClient, OrderTicket,
};
use delivery_invoicing::service::ReconcileSettings;
use delivery_invoicing::{create_pool, migrate, PollerSettings};

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Fresh in-memory ledger with the schema applied.
pub async fn memory_ledger() -> SqlitePool {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    migrate(&pool).await.unwrap();
    pool
}

#[derive(Default)]
struct FakeState {
    clients: Vec<Client>,
    created_clients: Vec<NewClient>,
    requests: Vec<InvoiceRequest>,
    listing: Vec<InvoiceSummary>,
    next_id: i64,
    amount_override: Option<BigDecimal>,
    fail_create: bool,
    fail_receipt: bool,
    fail_receipt_for: HashSet<i64>,
    receipt_calls: usize,
}

/// In-memory invoicer. Issued invoices get ids from 1000 upward and their
/// gross amount is the sum of the request lines unless overridden.
#[derive(Default)]
pub struct FakeInvoicer {
    state: Mutex<FakeState>,
}

impl FakeInvoicer {
    pub fn new() -> Self {
        let invoicer = Self::default();
        invoicer.state.lock().unwrap().next_id = 1000;
        invoicer
    }

    pub fn with_client(self, client: Client) -> Self {
        self.state.lock().unwrap().clients.push(client);
        self
    }

    pub fn with_listed(self, invoice: InvoiceSummary) -> Self {
        self.state.lock().unwrap().listing.push(invoice);
        self
    }

    pub fn set_amount_override(&self, amount: Option<BigDecimal>) {
        self.state.lock().unwrap().amount_override = amount;
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.state.lock().unwrap().fail_create = fail;
    }

    pub fn set_fail_receipt(&self, fail: bool) {
        self.state.lock().unwrap().fail_receipt = fail;
    }

    pub fn set_receipt_failure_for(&self, invoice_id: i64, fail: bool) {
        let mut state = self.state.lock().unwrap();
        if fail {
            state.fail_receipt_for.insert(invoice_id);
        } else {
            state.fail_receipt_for.remove(&invoice_id);
        }
    }

    pub fn requests(&self) -> Vec<InvoiceRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn created_clients(&self) -> Vec<NewClient> {
        self.state.lock().unwrap().created_clients.clone()
    }

    pub fn receipt_calls(&self) -> usize {
        self.state.lock().unwrap().receipt_calls
    }
}

pub fn receipt_for(invoice_id: i64) -> Vec<u8> {
    format!("receipt-{}", invoice_id).into_bytes()
}

#[async_trait]
impl Invoicer for FakeInvoicer {
    async fn search_clients(&self, query: &ClientQuery) -> Result<Vec<Client>, IntegrationError> {
        let state = self.state.lock().unwrap();
        let found = state
            .clients
            .iter()
            .filter(|c| match query {
                ClientQuery::FiscalId(v) => c.fiscal_id.as_deref() == Some(v.as_str()),
                ClientQuery::ExternalReference(v) => {
                    c.external_reference.as_deref() == Some(v.as_str())
                }
                ClientQuery::Name(v) => c.name.as_deref() == Some(v.as_str()),
            })
            .cloned()
            .collect();
        Ok(found)
    }

    async fn create_client(&self, client: &NewClient) -> Result<Client, IntegrationError> {
        let mut state = self.state.lock().unwrap();
        let id = 500 + state.clients.len() as i64;
        let created = Client {
            id,
            fiscal_id: client.fiscal_id.clone(),
            name: client.name.clone(),
            mobile: client.mobile.clone(),
            external_reference: client.external_reference.clone(),
        };
        state.created_clients.push(client.clone());
        state.clients.push(created.clone());
        Ok(created)
    }

    async fn create_invoice(
        &self,
        request: &InvoiceRequest,
    ) -> Result<CreatedInvoice, IntegrationError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create {
            return Err(IntegrationError::Http {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        state.requests.push(request.clone());
        let id = state.next_id;
        state.next_id += 1;
        let amount_gross = state
            .amount_override
            .clone()
            .unwrap_or_else(|| lines_total(&request.lines));
        state.listing.push(InvoiceSummary {
            id,
            date: Local::now().date_naive(),
            number: Some(format!("FR {}/{}", "01P2024", id)),
            external_reference: Some(request.external_reference.clone()),
            amount_gross: amount_gross.clone(),
            local_time: None,
        });
        Ok(CreatedInvoice { id, amount_gross })
    }

    async fn get_receipt(&self, invoice_id: i64) -> Result<Vec<u8>, IntegrationError> {
        let mut state = self.state.lock().unwrap();
        state.receipt_calls += 1;
        if state.fail_receipt || state.fail_receipt_for.contains(&invoice_id) {
            return Err(IntegrationError::Transport("connection reset".to_string()));
        }
        Ok(receipt_for(invoice_id))
    }

    async fn list_invoices(&self) -> Result<Vec<InvoiceSummary>, IntegrationError> {
        Ok(self.state.lock().unwrap().listing.clone())
    }
}

/// Feed returning a fixed snapshot every cycle.
pub struct StaticFeed {
    entries: Mutex<Vec<Value>>,
}

impl StaticFeed {
    pub fn new(tickets: Vec<Value>) -> Self {
        Self {
            entries: Mutex::new(tickets),
        }
    }

    pub fn replace(&self, tickets: Vec<Value>) {
        *self.entries.lock().unwrap() = tickets;
    }
}

#[async_trait]
impl OrderFeed for StaticFeed {
    async fn fetch_tickets(&self) -> Result<Vec<FeedEntry>, FeedError> {
        let values = self.entries.lock().unwrap().clone();
        Ok(values.into_iter().map(OrderTicket::from_value).collect())
    }
}

/// Line item in feed encoding.
pub fn item(sku: &str, units: i64, nanos: i32, quantity: u32, modifiers: Vec<Value>) -> Value {
    json!({
        "skuId": {"id": sku},
        "stationItemDetail": {
            "salePrice": {"units": units.to_string(), "nanos": nanos},
            "quantity": quantity,
            "name": sku,
            "note": null
        },
        "itemModifiers": modifiers
    })
}

pub fn modifier(sku: &str, units: i64, nanos: i32, quantity: u32) -> Value {
    json!({
        "skuId": {"id": sku},
        "orderItemDetail": {
            "salePrice": {"units": units.to_string(), "nanos": nanos},
            "quantity": quantity,
            "name": sku
        }
    })
}

/// Accepted ticket started now.
pub fn ticket(code: &str, price: &str, items: Vec<Value>) -> Value {
    json!({
        "code": code,
        "accepted": true,
        "canceled": false,
        "platform": "glovo",
        "customerName": "Ana",
        "customerPhone": null,
        "customerNote": null,
        "price": price,
        "startDate": Local::now().to_rfc3339(),
        "items": items
    })
}

pub const MAPPING: &str = r#"{
    "items": {
        "sku-burger": "BURGER",
        "sku-food": "FOOD",
        "sku-coke": "COKE",
        "sku-cheese": "CHEESE",
        "sku-pepsi": "PEPSI",
        "sku-bag": null
    },
    "sold_seperatly": ["COKE"]
}"#;

pub async fn write_mapping(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("invoicing.json");
    tokio::fs::write(&path, text).await.unwrap();
    path
}

/// No sleeps, two receipt attempts.
pub fn poller_settings(mapping_path: PathBuf) -> PollerSettings {
    PollerSettings {
        interval: Duration::from_millis(10),
        manual_import: true,
        mapping_path,
        reconcile: ReconcileSettings {
            only_today: true,
            receipt_attempts: 2,
            receipt_retry_delay: Duration::ZERO,
        },
    }
}
