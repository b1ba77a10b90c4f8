use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// References that are billed as their own line when found as a modifier.
pub type SoldSeparatelySet = HashSet<String>;

/// Operator-maintained mapping file:
/// `{"items": {sku_id: reference | null}, "sold_seperatly": [reference, ...]}`.
///
/// A `null` value means "ignore this SKU"; a missing key is a configuration error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemReferenceMap {
    #[serde(default)]
    pub items: HashMap<String, Option<String>>,
    #[serde(default, rename = "sold_seperatly", alias = "sold_separately")]
    pub sold_separately: SoldSeparatelySet,
}

impl ItemReferenceMap {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Re-read every cycle so operator edits apply without a restart.
    pub async fn load(path: &Path) -> Result<Self, crate::error::FeedError> {
        let text = tokio::fs::read_to_string(path).await?;
        Ok(Self::from_json(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mapping_file() {
        let map = ItemReferenceMap::from_json(
            r#"{"items": {"a": "FOOD", "b": null}, "sold_seperatly": ["COKE"]}"#,
        )
        .unwrap();

        assert_eq!(map.items.get("a"), Some(&Some("FOOD".to_string())));
        assert_eq!(map.items.get("b"), Some(&None));
        assert!(map.items.get("c").is_none());
        assert!(map.sold_separately.contains("COKE"));
    }

    #[test]
    fn sold_separately_is_optional() {
        let map = ItemReferenceMap::from_json(r#"{"items": {}}"#).unwrap();
        assert!(map.sold_separately.is_empty());
    }
}
