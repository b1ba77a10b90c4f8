use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::money;

/// One order from the ordering platform, as written to the ticket feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTicket {
    /// Stable external id, the dedup key of the ledger.
    pub code: String,
    #[serde(default)]
    pub accepted: bool,
    #[serde(default)]
    pub canceled: bool,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    /// Free text, may carry a fiscal id.
    #[serde(default)]
    pub customer_note: Option<String>,
    /// Authoritative total.
    #[serde(deserialize_with = "money::deserialize", serialize_with = "money::serialize")]
    pub price: BigDecimal,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub items: Vec<RawLineItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLineItem {
    pub sku_id: SkuId,
    pub station_item_detail: RawItemDetail,
    #[serde(default)]
    pub item_modifiers: Vec<RawModifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawModifier {
    pub sku_id: SkuId,
    pub order_item_detail: RawItemDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkuId {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItemDetail {
    pub sale_price: GoogleMoney,
    pub quantity: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Platform money encoding: whole units plus nano units.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleMoney {
    #[serde(default, deserialize_with = "money::deserialize_int64")]
    pub units: i64,
    #[serde(default)]
    pub nanos: i32,
}

impl GoogleMoney {
    pub fn to_decimal(&self) -> BigDecimal {
        money::from_units_nanos(self.units, self.nanos)
    }
}

/// A feed element that could not be decoded as a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedTicket {
    pub code: Option<String>,
    pub reason: String,
}

/// Each feed element is validated on its own so one broken ticket does not
/// hide the others.
pub type FeedEntry = Result<OrderTicket, MalformedTicket>;

impl OrderTicket {
    /// Validates one raw feed element.
    pub fn from_value(value: Value) -> FeedEntry {
        let code = value
            .get("code")
            .and_then(Value::as_str)
            .map(str::to_string);

        serde_json::from_value(value).map_err(|e| MalformedTicket {
            code,
            reason: e.to_string(),
        })
    }

    /// Decodes a whole feed document (a JSON array of tickets).
    pub fn parse_feed(text: &str) -> Result<Vec<FeedEntry>, serde_json::Error> {
        let values: Vec<Value> = serde_json::from_str(text)?;
        Ok(values.into_iter().map(Self::from_value).collect())
    }
}
