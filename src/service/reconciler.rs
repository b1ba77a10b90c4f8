use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clients::Invoicer;
use crate::db::queries;
use crate::error::{Halt, IntegrationError, ReconcileError};
use crate::models::item::lines_total;
use crate::models::{
    CreatedInvoice, InvoiceRequest, ItemReferenceMap, OrderTicket, SoldSeparatelySet,
    StackedInvoiceLine,
};
use crate::service::client_resolver::{resolve_client, CustomerIdentity};
use crate::service::nif;
use crate::service::normalizer::normalize;
use crate::service::resolver::ItemReferenceResolver;
use crate::service::stacking::stack_items;

#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    /// Only invoice tickets started on the current local date.
    pub only_today: bool,
    /// Receipt fetch attempts after the invoice was issued.
    pub receipt_attempts: u32,
    pub receipt_retry_delay: Duration,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            only_today: true,
            receipt_attempts: 3,
            receipt_retry_delay: Duration::from_millis(500),
        }
    }
}

/// Inputs shared by every ticket of one poll cycle.
#[derive(Debug, Clone)]
pub struct CycleContext {
    pub resolver: ItemReferenceResolver,
    pub sold_separately: SoldSeparatelySet,
    pub today: NaiveDate,
}

impl CycleContext {
    pub fn new(map: ItemReferenceMap, today: NaiveDate) -> Self {
        let sold_separately = map.sold_separately.clone();
        Self {
            resolver: ItemReferenceResolver::new(map),
            sold_separately,
            today,
        }
    }
}

/// Why an ineligible ticket was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotAccepted,
    Canceled,
    AlreadyInvoiced,
    NotToday,
}

#[derive(Debug)]
pub enum TicketOutcome {
    Invoiced { invoice_id: i64 },
    Skipped(SkipReason),
    /// Retried identically next cycle.
    Failed(ReconcileError),
}

/// Per-ticket states. Failure exits leave the loop through `Exit`.
#[derive(Debug)]
enum State {
    Eligible,
    Building,
    Verifying(CreatedInvoice),
    Persisting(CreatedInvoice),
    Done(i64),
}

enum Exit {
    Retry(ReconcileError),
    Fatal(Halt),
}

impl From<ReconcileError> for Exit {
    fn from(e: ReconcileError) -> Self {
        Exit::Retry(e)
    }
}

impl From<IntegrationError> for Exit {
    fn from(e: IntegrationError) -> Self {
        Exit::Retry(ReconcileError::Transient(e))
    }
}

impl From<Halt> for Exit {
    fn from(h: Halt) -> Self {
        Exit::Fatal(h)
    }
}

/// Local date a ticket was started on.
pub fn start_date(ticket: &OrderTicket) -> Result<NaiveDate, ReconcileError> {
    let raw = ticket
        .start_date
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ReconcileError::MalformedInput {
            field: "startDate",
            detail: "missing".to_string(),
        })?;

    let raw = raw.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(raw) {
        return Ok(d.with_timezone(&Local).date_naive());
    }
    // no offset: local wall-clock time
    if let Ok(d) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(d.date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| ReconcileError::MalformedInput {
        field: "startDate",
        detail: format!("{}: {}", raw, e),
    })
}

fn invoice_notes(ticket: &OrderTicket) -> Option<String> {
    let name = ticket.customer_name.as_deref().map(str::trim).unwrap_or("");
    match ticket.platform.as_deref() {
        Some(platform) => Some(format!("{} ({})", name, platform).trim().to_string()),
        None if !name.is_empty() => Some(name.to_string()),
        None => None,
    }
}

/// Drives one ticket from eligibility to a ledger row, at most once.
pub struct Reconciler {
    pool: SqlitePool,
    invoicer: Arc<dyn Invoicer>,
    settings: ReconcileSettings,
}

impl Reconciler {
    pub fn new(pool: SqlitePool, invoicer: Arc<dyn Invoicer>, settings: ReconcileSettings) -> Self {
        Self {
            pool,
            invoicer,
            settings,
        }
    }

    /// `Err` only for conditions that must stop the process.
    pub async fn reconcile(
        &self,
        ticket: &OrderTicket,
        ctx: &CycleContext,
    ) -> Result<TicketOutcome, Halt> {
        match self.run(ticket, ctx).await {
            Ok(outcome) => Ok(outcome),
            Err(Exit::Retry(e)) => Ok(TicketOutcome::Failed(e)),
            Err(Exit::Fatal(halt)) => Err(halt),
        }
    }

    async fn run(&self, ticket: &OrderTicket, ctx: &CycleContext) -> Result<TicketOutcome, Exit> {
        let mut state = State::Eligible;

        loop {
            state = match state {
                State::Eligible => {
                    if let Some(reason) = self.check_eligibility(ticket, ctx).await? {
                        return Ok(TicketOutcome::Skipped(reason));
                    }
                    State::Building
                }
                State::Building => State::Verifying(self.build(ticket, ctx).await?),
                State::Verifying(invoice) => {
                    if invoice.amount_gross != ticket.price {
                        return Err(Halt::AmountMismatch {
                            code: ticket.code.clone(),
                            expected: ticket.price.clone(),
                            invoiced: invoice.amount_gross,
                            invoice_id: Some(invoice.id),
                        }
                        .into());
                    }
                    State::Persisting(invoice)
                }
                State::Persisting(invoice) => {
                    self.persist(ticket, &invoice).await?;
                    State::Done(invoice.id)
                }
                State::Done(invoice_id) => {
                    return Ok(TicketOutcome::Invoiced { invoice_id });
                }
            };
            debug!("ticket {} -> {:?}", ticket.code, state);
        }
    }

    async fn check_eligibility(
        &self,
        ticket: &OrderTicket,
        ctx: &CycleContext,
    ) -> Result<Option<SkipReason>, ReconcileError> {
        if !ticket.accepted {
            return Ok(Some(SkipReason::NotAccepted));
        }
        if ticket.canceled {
            return Ok(Some(SkipReason::Canceled));
        }
        if queries::was_delivery_invoiced(&self.pool, &ticket.code).await? {
            return Ok(Some(SkipReason::AlreadyInvoiced));
        }
        if self.settings.only_today && start_date(ticket)? != ctx.today {
            return Ok(Some(SkipReason::NotToday));
        }
        Ok(None)
    }

    /// Stacks lines, checks them against the ticket total, resolves the client
    /// and issues the invoice.
    async fn build(&self, ticket: &OrderTicket, ctx: &CycleContext) -> Result<CreatedInvoice, Exit> {
        let candidates = normalize(ticket, &ctx.resolver).collect::<Result<Vec<_>, _>>()?;
        let lines: Vec<StackedInvoiceLine> = stack_items(candidates, &ctx.sold_separately);

        if lines.is_empty() {
            return Err(ReconcileError::MalformedInput {
                field: "items",
                detail: "no invoiceable items".to_string(),
            }
            .into());
        }

        let total = lines_total(&lines);
        if total != ticket.price {
            return Err(Halt::AmountMismatch {
                code: ticket.code.clone(),
                expected: ticket.price.clone(),
                invoiced: total,
                invoice_id: None,
            }
            .into());
        }

        let identity = CustomerIdentity {
            nif: nif::find(ticket.customer_note.as_deref()),
            phone: ticket.customer_phone.clone(),
            name: ticket.customer_name.clone(),
        };
        let client_id = resolve_client(self.invoicer.as_ref(), &identity).await?;

        debug!("Will invoice {} items {:?}", ticket.code, lines);

        let request = InvoiceRequest {
            lines,
            client_id,
            external_reference: ticket.code.clone(),
            notes: invoice_notes(ticket),
        };
        let invoice = self.invoicer.create_invoice(&request).await?;

        debug!("Invoiced {} - {}", ticket.code, invoice.id);
        Ok(invoice)
    }

    /// Past this point the invoice exists upstream; every failure is fatal.
    async fn persist(&self, ticket: &OrderTicket, invoice: &CreatedInvoice) -> Result<(), Halt> {
        let receipt = self.fetch_receipt(ticket, invoice.id).await?;

        queries::save_invoice(&self.pool, invoice.id, Some(&ticket.code), &receipt)
            .await
            .map_err(|source| Halt::Persistence {
                code: ticket.code.clone(),
                invoice_id: invoice.id,
                source,
            })?;

        info!("Saved invoice {} - {}", ticket.code, invoice.id);
        Ok(())
    }

    async fn fetch_receipt(&self, ticket: &OrderTicket, invoice_id: i64) -> Result<Vec<u8>, Halt> {
        let attempts = self.settings.receipt_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.invoicer.get_receipt(invoice_id).await {
                Ok(receipt) => return Ok(receipt),
                Err(source) if attempt >= attempts => {
                    return Err(Halt::Receipt {
                        code: ticket.code.clone(),
                        invoice_id,
                        source,
                    });
                }
                Err(e) => {
                    warn!(
                        "Receipt for {} - {} failed (attempt {}/{}): {}",
                        ticket.code, invoice_id, attempt, attempts, e
                    );
                    attempt += 1;
                    tokio::time::sleep(self.settings.receipt_retry_delay).await;
                }
            }
        }
    }
}
