use bigdecimal::BigDecimal;
use serde::{de, Deserialize, Deserializer, Serializer};
use std::str::FromStr;

/// Decimal places used for every amount billed or compared.
pub const MONEY_SCALE: i64 = 2;

/// Rounds an amount to cents, keeping a fixed scale of two.
pub fn to_money(value: &BigDecimal) -> BigDecimal {
    value.round(MONEY_SCALE).with_scale(MONEY_SCALE)
}

/// Converts platform money (whole units + nano units) to a two-decimal amount:
/// `round(units + nanos * 1e-9, 2)`.
pub fn from_units_nanos(units: i64, nanos: i32) -> BigDecimal {
    let fraction = BigDecimal::from(nanos) / BigDecimal::from(1_000_000_000i64);
    to_money(&(BigDecimal::from(units) + fraction))
}

/// Parses a decimal amount from text such as `"12.50"`.
pub fn parse(text: &str) -> Option<BigDecimal> {
    BigDecimal::from_str(text.trim()).ok().map(|v| to_money(&v))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    Text(String),
}

/// Accepts both JSON numbers and numeric strings; the invoicer reports
/// amounts as strings while the ticket feed uses numbers.
pub fn deserialize<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n.to_string(),
        NumberOrString::Text(s) => s,
    };
    parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid amount: {}", raw)))
}

/// Writes the two-decimal text (`"1.15"`), never a float.
pub fn serialize<S>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&to_money(value).to_string())
}

/// Platform int64 fields arrive either as numbers or as strings (`"12"`).
pub fn deserialize_int64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n
            .as_i64()
            .ok_or_else(|| de::Error::custom(format!("invalid integer: {}", n))),
        NumberOrString::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| de::Error::custom(format!("invalid integer: {}", s))),
    }
}
