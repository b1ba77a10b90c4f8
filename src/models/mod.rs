pub mod invoicer;
pub mod item;
pub mod mapping;
pub mod money;
pub mod record;
pub mod ticket;

pub use invoicer::{Client, ClientQuery, CreatedInvoice, InvoiceRequest, InvoiceSummary, NewClient};
pub use item::{lines_total, InvoiceItemCandidate, InvoiceModifierCandidate, StackedInvoiceLine};
pub use mapping::{ItemReferenceMap, SoldSeparatelySet};
pub use record::{InvoiceRecord, LedgerEntry};
pub use ticket::{FeedEntry, GoogleMoney, MalformedTicket, OrderTicket, RawItemDetail, RawLineItem, RawModifier, SkuId};
