use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use tokio::sync::Mutex;

use crate::clients::{file_feed, OrderFeed};
use crate::error::{FeedError, IntegrationError};
use crate::models::{FeedEntry, GoogleMoney, MalformedTicket, OrderTicket, RawLineItem};

pub const DEFAULT_BASE_URL: &str = "https://api.tryotter.com";

const ACTIVE_ORDERS_LIMIT: u32 = 100;
const CANCELED_STATUS: &str = "OFO_STATUS_CANCELED";
const CONFIRMED_STATE: &str = "CONFIRMATION_CONFIRMED";
/// Uber Eats masks customer phone numbers.
const PHONELESS_PLATFORM: &str = "ubereats";

/// Ordering-platform session. Re-authenticates once, transparently, when the
/// access token is rejected.
#[derive(Debug)]
pub struct OtterClient {
    email: String,
    password: String,
    http: reqwest::Client,
    base_url: String,
    access_token: Mutex<Option<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResource {
    access_token: String,
}

#[derive(Deserialize)]
struct OrdersResource {
    #[serde(default)]
    orders: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlatformOrder {
    customer_order: CustomerOrder,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerOrder {
    ofo_slug: String,
    external_order_id: ExternalOrderId,
    #[serde(default)]
    ofo_status: Option<String>,
    #[serde(default)]
    customer: PlatformCustomer,
    #[serde(default)]
    customer_note: Option<String>,
    customer_payment: CustomerPayment,
    #[serde(default)]
    station_orders: Vec<StationOrder>,
    #[serde(default)]
    confirmation_info: Option<ConfirmationInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExternalOrderId {
    display_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlatformCustomer {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CustomerPayment {
    total: GoogleMoney,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StationOrder {
    #[serde(default)]
    activated_at: Option<String>,
    #[serde(default)]
    menu_reconciled_items_container: Option<ItemsContainer>,
}

#[derive(Debug, Deserialize)]
struct ItemsContainer {
    #[serde(default)]
    items: Vec<RawLineItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmationInfo {
    #[serde(default)]
    confirmation_state: Option<String>,
}

impl PlatformOrder {
    fn into_ticket(self) -> OrderTicket {
        let order = self.customer_order;

        let canceled = order.ofo_status.as_deref() == Some(CANCELED_STATUS);
        let accepted = order
            .confirmation_info
            .as_ref()
            .and_then(|c| c.confirmation_state.as_deref())
            == Some(CONFIRMED_STATE);

        let phone = if order.ofo_slug == PHONELESS_PLATFORM {
            None
        } else {
            order.customer.phone
        };

        let mut station_orders = order.station_orders.into_iter();
        let (activated_at, items) = match station_orders.next() {
            Some(station) => (
                station.activated_at,
                station
                    .menu_reconciled_items_container
                    .map(|c| c.items)
                    .unwrap_or_default(),
            ),
            None => (None, Vec::new()),
        };

        OrderTicket {
            code: order.external_order_id.display_id,
            accepted,
            canceled,
            platform: Some(order.ofo_slug),
            customer_name: order.customer.display_name,
            customer_phone: phone,
            customer_note: order.customer_note,
            price: order.customer_payment.total.to_decimal(),
            start_date: if accepted { activated_at } else { None },
            items,
        }
    }
}

/// Converts one raw platform order into a feed entry.
pub fn ticket_from_platform_order(value: Value) -> FeedEntry {
    let code = value
        .pointer("/customerOrder/externalOrderId/displayId")
        .and_then(Value::as_str)
        .map(str::to_string);

    serde_json::from_value::<PlatformOrder>(value)
        .map(PlatformOrder::into_ticket)
        .map_err(|e| MalformedTicket {
            code,
            reason: e.to_string(),
        })
}

impl OtterClient {
    pub fn new(email: String, password: String) -> Self {
        Self::new_with_base_url(email, password, DEFAULT_BASE_URL.to_string())
    }

    pub fn new_with_base_url(email: String, password: String, base_url: String) -> Self {
        Self {
            email,
            password,
            http: reqwest::Client::new(),
            base_url,
            access_token: Mutex::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub async fn login(&self) -> Result<(), IntegrationError> {
        let resp = self
            .http
            .post(self.url("/users/sign_in"))
            .json(&serde_json::json!({"email": self.email, "password": self.password}))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(IntegrationError::Http {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let resource: SignInResource = resp.json().await?;
        *self.access_token.lock().await = Some(resource.access_token);
        tracing::debug!("Logged in to ordering platform");
        Ok(())
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<Response, IntegrationError> {
        let token = self.access_token.lock().await.clone();
        let request = match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        Ok(request.send().await?)
    }

    fn is_auth_failure(status: StatusCode) -> bool {
        status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
    }

    /// Active orders for a facility, as raw platform documents.
    pub async fn fetch_active_orders(&self, facility_id: &str) -> Result<Vec<Value>, IntegrationError> {
        if self.access_token.lock().await.is_none() {
            self.login().await?;
        }

        let limit = ACTIVE_ORDERS_LIMIT.to_string();
        let build = || {
            self.http
                .get(self.url("/ufo/otter_order_active"))
                .header("accept", "application/json")
                .query(&[("facility_id", facility_id), ("limit", limit.as_str())])
        };

        let mut resp = self.authorized(build()).await?;
        if Self::is_auth_failure(resp.status()) {
            tracing::debug!("Access token rejected, refreshing");
            self.login().await?;
            resp = self.authorized(build()).await?;
            if Self::is_auth_failure(resp.status()) {
                return Err(IntegrationError::Unauthorized);
            }
        }

        let status = resp.status();
        if !status.is_success() {
            return Err(IntegrationError::Http {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let resource: OrdersResource = resp.json().await?;
        Ok(resource.orders)
    }
}

/// Feed backed by the ordering platform. Optionally mirrors each snapshot to
/// a JSON file in the `FileOrderFeed` format for other consumers.
#[derive(Debug)]
pub struct OtterOrderFeed {
    client: OtterClient,
    facility_id: String,
    snapshot_path: Option<PathBuf>,
}

impl OtterOrderFeed {
    pub fn new(client: OtterClient, facility_id: String, snapshot_path: Option<PathBuf>) -> Self {
        Self {
            client,
            facility_id,
            snapshot_path,
        }
    }
}

#[async_trait]
impl OrderFeed for OtterOrderFeed {
    async fn fetch_tickets(&self) -> Result<Vec<FeedEntry>, FeedError> {
        let orders = self.client.fetch_active_orders(&self.facility_id).await?;
        let entries: Vec<FeedEntry> = orders.into_iter().map(ticket_from_platform_order).collect();

        if let Some(path) = &self.snapshot_path {
            let tickets: Vec<OrderTicket> = entries
                .iter()
                .filter_map(|e| e.as_ref().ok().cloned())
                .collect();
            if let Err(e) = file_feed::write_snapshot(path, &tickets).await {
                tracing::warn!("Failed to write orders snapshot {}: {}", path.display(), e);
            }
        }

        tracing::debug!("Orders updated: {}", entries.len());
        Ok(entries)
    }
}
