use crate::error::ReconcileError;
use crate::models::ItemReferenceMap;

/// Result of looking up an external SKU id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    Reference(&'a str),
    /// Explicit `null` in the mapping file: skip silently.
    Ignored,
}

/// Maps external menu-item ids to internal invoice references.
#[derive(Debug, Clone, Default)]
pub struct ItemReferenceResolver {
    map: ItemReferenceMap,
}

impl ItemReferenceResolver {
    pub fn new(map: ItemReferenceMap) -> Self {
        Self { map }
    }

    /// Fails with `ReconcileError::Configuration` when the id has no entry at all.
    pub fn resolve(&self, sku_id: &str) -> Result<Resolution<'_>, ReconcileError> {
        match self.map.items.get(sku_id) {
            Some(Some(reference)) => Ok(Resolution::Reference(reference)),
            Some(None) => Ok(Resolution::Ignored),
            None => Err(ReconcileError::Configuration {
                sku_id: sku_id.to_string(),
            }),
        }
    }

    pub fn map(&self) -> &ItemReferenceMap {
        &self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureClass;

    fn resolver() -> ItemReferenceResolver {
        ItemReferenceResolver::new(
            ItemReferenceMap::from_json(r#"{"items": {"a": "FOOD", "bag": null}}"#).unwrap(),
        )
    }

    #[test]
    fn resolves_mapped_and_ignored_ids() {
        let r = resolver();
        assert_eq!(r.resolve("a").unwrap(), Resolution::Reference("FOOD"));
        assert_eq!(r.resolve("bag").unwrap(), Resolution::Ignored);
    }

    #[test]
    fn unmapped_id_is_configuration_error() {
        let err = resolver().resolve("zzz").unwrap_err();
        assert_eq!(err.class(), FailureClass::Configuration);
        match err {
            ReconcileError::Configuration { sku_id } => assert_eq!(sku_id, "zzz"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
