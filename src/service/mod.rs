pub mod audit;
pub mod client_resolver;
pub mod manual_import;
pub mod nif;
pub mod normalizer;
pub mod poller;
pub mod reconciler;
pub mod resolver;
pub mod stacking;

pub use audit::{audit_ledger, AuditReport};
pub use manual_import::ManualInvoiceImporter;
pub use poller::{CycleReport, Poller, PollerSettings};
pub use reconciler::{CycleContext, ReconcileSettings, Reconciler, SkipReason, TicketOutcome};
pub use resolver::{ItemReferenceResolver, Resolution};
pub use stacking::stack_items;
