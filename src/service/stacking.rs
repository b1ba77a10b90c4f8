use bigdecimal::BigDecimal;
use indexmap::IndexMap;
use std::iter;

use crate::models::money::to_money;
use crate::models::{
    InvoiceItemCandidate, InvoiceModifierCandidate, SoldSeparatelySet, StackedInvoiceLine,
};

const NOTE_SEPARATOR: &str = ", ";

/// Order-independent identity of a modifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct ModifierKey {
    reference: String,
    price: String,
    quantity: u32,
    note: Option<String>,
}

/// Structural identity of a unit candidate. Modifiers are sorted so insertion
/// order on the ticket cannot split a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StackKey {
    reference: String,
    price: String,
    note: Option<String>,
    modifiers: Vec<ModifierKey>,
}

impl ModifierKey {
    fn of(modifier: &InvoiceModifierCandidate) -> Self {
        Self {
            reference: modifier.reference.clone(),
            price: to_money(&modifier.price).to_string(),
            quantity: modifier.quantity,
            note: modifier.note.clone(),
        }
    }
}

impl StackKey {
    fn of(item: &InvoiceItemCandidate) -> Self {
        let mut modifiers: Vec<ModifierKey> = item.modifiers.iter().map(ModifierKey::of).collect();
        modifiers.sort();

        Self {
            reference: item.reference.clone(),
            price: to_money(&item.price).to_string(),
            note: item.note.clone(),
            modifiers,
        }
    }
}

fn join_note<I>(segments: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    let joined = segments
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(NOTE_SEPARATOR);

    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Sold-separately modifiers become standalone candidates and are removed
/// from their parent. The parent's note keeps a summary of what was detached.
fn detach_sold_separately(
    items: impl IntoIterator<Item = InvoiceItemCandidate>,
    sold_separately: &SoldSeparatelySet,
) -> Vec<InvoiceItemCandidate> {
    let mut out = Vec::new();

    for item in items {
        let (detached, kept): (Vec<_>, Vec<_>) = item
            .modifiers
            .into_iter()
            .partition(|m| sold_separately.contains(&m.reference));

        for modifier in &detached {
            out.push(InvoiceItemCandidate {
                reference: modifier.reference.clone(),
                price: modifier.price.clone(),
                // modifier quantities are per parent unit; `normalize` bounds
                // both factors to MAX_QUANTITY
                quantity: modifier.quantity.saturating_mul(item.quantity),
                note: modifier.note.clone(),
                modifiers: Vec::new(),
            });
        }

        let note = if detached.is_empty() {
            item.note
        } else {
            let mut sorted = detached;
            sorted.sort_by_key(ModifierKey::of);
            join_note(
                sorted
                    .iter()
                    .map(InvoiceModifierCandidate::summary)
                    .chain(item.note),
            )
        };

        out.push(InvoiceItemCandidate {
            reference: item.reference,
            price: item.price,
            quantity: item.quantity,
            note,
            modifiers: kept,
        });
    }

    out
}

/// A candidate of quantity N becomes N candidates of quantity 1.
fn expand(items: Vec<InvoiceItemCandidate>) -> impl Iterator<Item = InvoiceItemCandidate> {
    items.into_iter().flat_map(|item| {
        let count = item.quantity as usize;
        iter::repeat(InvoiceItemCandidate {
            quantity: 1,
            ..item
        })
        .take(count)
    })
}

/// Folds the remaining modifiers into one billable line.
fn collapse(item: InvoiceItemCandidate, count: u32) -> StackedInvoiceLine {
    let mut modifiers = item.modifiers;
    modifiers.sort_by_key(ModifierKey::of);

    let modifier_cost = modifiers.iter().fold(BigDecimal::from(0), |acc, m| {
        acc + m.price.clone() * BigDecimal::from(m.quantity)
    });

    let note = join_note(
        modifiers
            .iter()
            .map(InvoiceModifierCandidate::summary)
            .chain(item.note),
    );

    StackedInvoiceLine {
        reference: item.reference,
        price: to_money(&(item.price + modifier_cost)),
        quantity: count,
        note,
    }
}

/// Aggregates a ticket's candidates into the minimal, deterministic set of
/// invoice lines, sorted by reference.
pub fn stack_items(
    items: impl IntoIterator<Item = InvoiceItemCandidate>,
    sold_separately: &SoldSeparatelySet,
) -> Vec<StackedInvoiceLine> {
    let detached = detach_sold_separately(items, sold_separately);

    // count structurally equal unit candidates
    let mut groups: IndexMap<StackKey, (InvoiceItemCandidate, u32)> = IndexMap::new();
    for unit in expand(detached) {
        groups
            .entry(StackKey::of(&unit))
            .or_insert_with(|| (unit, 0))
            .1 += 1;
    }

    // Distinct groups may still render to the same line
    // (same billed price and note), those are merged too.
    let mut lines: IndexMap<(String, String, Option<String>), StackedInvoiceLine> = IndexMap::new();
    for (_, (unit, count)) in groups {
        let line = collapse(unit, count);
        let key = (line.reference.clone(), line.price.to_string(), line.note.clone());
        match lines.get_mut(&key) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => {
                lines.insert(key, line);
            }
        }
    }

    let mut lines: Vec<StackedInvoiceLine> = lines.into_values().collect();
    lines.sort_by(|a, b| {
        a.reference
            .cmp(&b.reference)
            .then_with(|| a.price.cmp(&b.price))
            .then_with(|| a.note.cmp(&b.note))
    });
    lines
}
