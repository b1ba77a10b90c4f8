use crate::error::ReconcileError;
use crate::models::{InvoiceItemCandidate, InvoiceModifierCandidate, OrderTicket, RawLineItem};
use crate::service::resolver::{ItemReferenceResolver, Resolution};

/// Largest quantity accepted on a line or modifier. Stacking expands lines
/// to unit candidates, so the bound also caps that work.
pub const MAX_QUANTITY: u32 = 10_000;

fn checked_quantity(sku_id: &str, quantity: u32) -> Result<u32, ReconcileError> {
    if quantity > MAX_QUANTITY {
        return Err(ReconcileError::MalformedInput {
            field: "quantity",
            detail: format!("{} for {} exceeds {}", quantity, sku_id, MAX_QUANTITY),
        });
    }
    Ok(quantity)
}

fn non_empty(note: &Option<String>) -> Option<String> {
    note.as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

fn normalize_item(
    item: &RawLineItem,
    resolver: &ItemReferenceResolver,
) -> Result<Option<InvoiceItemCandidate>, ReconcileError> {
    let reference = match resolver.resolve(&item.sku_id.id)? {
        Resolution::Reference(r) => r.to_string(),
        // modifiers of an ignored item are skipped with it
        Resolution::Ignored => return Ok(None),
    };

    let detail = &item.station_item_detail;
    let mut modifiers = Vec::with_capacity(item.item_modifiers.len());

    for modifier in &item.item_modifiers {
        let modifier_reference = match resolver.resolve(&modifier.sku_id.id)? {
            Resolution::Reference(r) => r.to_string(),
            Resolution::Ignored => continue,
        };
        let modifier_detail = &modifier.order_item_detail;

        modifiers.push(InvoiceModifierCandidate {
            reference: modifier_reference,
            price: modifier_detail.sale_price.to_decimal(),
            quantity: checked_quantity(&modifier.sku_id.id, modifier_detail.quantity)?,
            note: non_empty(&modifier_detail.note),
        });
    }

    Ok(Some(InvoiceItemCandidate {
        reference,
        price: detail.sale_price.to_decimal(),
        quantity: checked_quantity(&item.sku_id.id, detail.quantity)?,
        note: non_empty(&detail.note),
        modifiers,
    }))
}

/// Lazily turns a ticket's raw lines into invoice item candidates, in ticket
/// order, one per non-ignored line. Quantities are carried through unexpanded.
pub fn normalize<'a>(
    ticket: &'a OrderTicket,
    resolver: &'a ItemReferenceResolver,
) -> impl Iterator<Item = Result<InvoiceItemCandidate, ReconcileError>> + 'a {
    ticket
        .items
        .iter()
        .filter_map(move |item| normalize_item(item, resolver).transpose())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{money, ItemReferenceMap};
    use serde_json::json;

    fn resolver() -> ItemReferenceResolver {
        ItemReferenceResolver::new(
            ItemReferenceMap::from_json(
                r#"{"items": {"burger": "FOOD", "coke": "COKE", "bag": null, "cutlery": null}}"#,
            )
            .unwrap(),
        )
    }

    fn ticket(items: serde_json::Value) -> OrderTicket {
        OrderTicket::from_value(json!({
            "code": "T1",
            "accepted": true,
            "price": 10,
            "items": items,
        }))
        .unwrap()
    }

    fn line(sku: &str, units: i64, nanos: i32, qty: u32, mods: serde_json::Value) -> serde_json::Value {
        json!({
            "skuId": {"id": sku},
            "stationItemDetail": {"salePrice": {"units": units, "nanos": nanos}, "quantity": qty, "name": sku},
            "itemModifiers": mods,
        })
    }

    fn modifier(sku: &str, units: i64, nanos: i32, qty: u32) -> serde_json::Value {
        json!({
            "skuId": {"id": sku},
            "orderItemDetail": {"salePrice": {"units": units, "nanos": nanos}, "quantity": qty, "name": sku},
        })
    }

    #[test]
    fn converts_lines_and_attaches_modifiers() {
        let t = ticket(json!([
            line("burger", 5, 0, 2, json!([modifier("coke", 0, 500_000_000, 2), modifier("cutlery", 0, 0, 1)])),
        ]));
        let r = resolver();

        let items: Vec<_> = normalize(&t, &r).collect::<Result<_, _>>().unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].reference, "FOOD");
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].price, money::parse("5.00").unwrap());
        assert_eq!(items[0].modifiers.len(), 1);
        assert_eq!(items[0].modifiers[0].reference, "COKE");
        assert_eq!(items[0].modifiers[0].price, money::parse("0.50").unwrap());
        assert_eq!(items[0].modifiers[0].quantity, 2);
    }

    #[test]
    fn oversized_quantity_is_malformed() {
        let r = resolver();

        let t = ticket(json!([line("burger", 5, 0, u32::MAX, json!([]))]));
        match normalize(&t, &r).collect::<Result<Vec<_>, _>>() {
            Err(ReconcileError::MalformedInput { field, .. }) => assert_eq!(field, "quantity"),
            other => panic!("unexpected: {other:?}"),
        }

        let t = ticket(json!([
            line("burger", 5, 0, 70_000, json!([modifier("coke", 0, 500_000_000, 70_000)])),
        ]));
        assert!(normalize(&t, &r).collect::<Result<Vec<_>, _>>().is_err());

        let t = ticket(json!([
            line("burger", 5, 0, MAX_QUANTITY, json!([modifier("coke", 0, 500_000_000, MAX_QUANTITY)])),
        ]));
        assert!(normalize(&t, &r).collect::<Result<Vec<_>, _>>().is_ok());
    }

    #[test]
    fn ignored_item_drops_its_modifiers() {
        let t = ticket(json!([
            line("bag", 0, 100_000_000, 1, json!([modifier("unknown-mod", 1, 0, 1)])),
            line("coke", 1, 0, 1, json!([])),
        ]));
        let r = resolver();

        let items: Vec<_> = normalize(&t, &r).collect::<Result<_, _>>().unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].reference, "COKE");
    }

    #[test]
    fn unmapped_modifier_fails_the_ticket() {
        let t = ticket(json!([
            line("burger", 5, 0, 1, json!([modifier("pickles", 0, 0, 1)])),
        ]));
        let r = resolver();

        let result: Result<Vec<_>, _> = normalize(&t, &r).collect();
        match result {
            Err(ReconcileError::Configuration { sku_id }) => assert_eq!(sku_id, "pickles"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
