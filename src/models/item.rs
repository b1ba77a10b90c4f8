use bigdecimal::BigDecimal;
use serde::Serialize;

use crate::models::money;

/// An add-on attached to an invoice item candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceModifierCandidate {
    pub reference: String,
    /// Per unit.
    pub price: BigDecimal,
    pub quantity: u32,
    pub note: Option<String>,
}

/// One normalized ticket line, before stacking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceItemCandidate {
    pub reference: String,
    /// Per unit, without modifiers.
    pub price: BigDecimal,
    pub quantity: u32,
    pub note: Option<String>,
    pub modifiers: Vec<InvoiceModifierCandidate>,
}

/// Final line sent to the invoicer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackedInvoiceLine {
    pub reference: String,
    /// Unit price including the folded-in modifier cost.
    #[serde(serialize_with = "money::serialize")]
    pub price: BigDecimal,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl InvoiceModifierCandidate {
    /// `"{quantity}x {reference}"`, the modifier's segment of a line note.
    pub fn summary(&self) -> String {
        format!("{}x {}", self.quantity, self.reference)
    }
}

impl StackedInvoiceLine {
    pub fn total(&self) -> BigDecimal {
        self.price.clone() * BigDecimal::from(self.quantity)
    }
}

/// Feeding stacked lines back through stacking treats them as plain items.
impl From<StackedInvoiceLine> for InvoiceItemCandidate {
    fn from(line: StackedInvoiceLine) -> Self {
        Self {
            reference: line.reference,
            price: line.price,
            quantity: line.quantity,
            note: line.note,
            modifiers: Vec::new(),
        }
    }
}

/// Sum of `price * quantity` over billed lines.
pub fn lines_total(lines: &[StackedInvoiceLine]) -> BigDecimal {
    lines
        .iter()
        .fold(BigDecimal::from(0), |acc, line| acc + line.total())
}
