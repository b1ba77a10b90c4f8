use chrono::{Local, NaiveDate};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::clients::{Invoicer, OrderFeed};
use crate::error::{FailureClass, Halt, ReconcileError};
use crate::models::ItemReferenceMap;
use crate::service::manual_import::ManualInvoiceImporter;
use crate::service::reconciler::{
    CycleContext, ReconcileSettings, Reconciler, TicketOutcome,
};

#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// Fixed delay between cycles.
    pub interval: Duration,
    pub manual_import: bool,
    /// Item reference map, re-read every cycle.
    pub mapping_path: PathBuf,
    pub reconcile: ReconcileSettings,
}

/// What one cycle did, for logs and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub imported: usize,
    pub invoiced: Vec<String>,
    pub skipped: usize,
    pub failed: Vec<(String, FailureClass)>,
    pub malformed: usize,
    /// Feed or mapping unreadable; no ticket was looked at.
    pub cycle_skipped: bool,
}

fn log_failure(code: &str, err: &ReconcileError) {
    match err.class() {
        FailureClass::Configuration => error!(
            "Ticket {}: {}. Please update the item reference map",
            code, err
        ),
        FailureClass::Transient => warn!("Ticket {}: invoicer failed, will retry: {}", code, err),
        FailureClass::MalformedInput => warn!("Ticket {}: {}. Will retry", code, err),
    }
}

/// Single sequential loop: manual import, ticket refresh, per-ticket
/// reconciliation, fixed sleep.
pub struct Poller {
    reconciler: Reconciler,
    importer: ManualInvoiceImporter,
    feed: Arc<dyn OrderFeed>,
    settings: PollerSettings,
}

impl Poller {
    pub fn new(
        pool: SqlitePool,
        invoicer: Arc<dyn Invoicer>,
        feed: Arc<dyn OrderFeed>,
        settings: PollerSettings,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(pool.clone(), invoicer.clone(), settings.reconcile.clone()),
            importer: ManualInvoiceImporter::new(pool, invoicer),
            feed,
            settings,
        }
    }

    /// One pass over the feed. Only a `Halt` escapes; every other failure is
    /// logged at the ticket or cycle boundary.
    pub async fn run_cycle(&self, today: NaiveDate) -> Result<CycleReport, Halt> {
        let mut report = CycleReport::default();

        if self.settings.manual_import {
            match self.importer.import(today).await {
                Ok(n) => report.imported = n,
                Err(e) => warn!("Failed manual import. Will retry: {}", e),
            }
        }

        let map = match ItemReferenceMap::load(&self.settings.mapping_path).await {
            Ok(map) => map,
            Err(e) => {
                error!(
                    "Unable to read item reference map {}: {}. Will retry",
                    self.settings.mapping_path.display(),
                    e
                );
                report.cycle_skipped = true;
                return Ok(report);
            }
        };

        let entries = match self.feed.fetch_tickets().await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Unable to read tickets: {}. Will retry", e);
                report.cycle_skipped = true;
                return Ok(report);
            }
        };

        let ctx = CycleContext::new(map, today);

        for entry in entries {
            let ticket = match entry {
                Ok(ticket) => ticket,
                Err(malformed) => {
                    warn!(
                        "Ticket {}: malformed, skipped: {}",
                        malformed.code.as_deref().unwrap_or("?"),
                        malformed.reason
                    );
                    report.malformed += 1;
                    continue;
                }
            };

            match self.reconciler.reconcile(&ticket, &ctx).await? {
                TicketOutcome::Invoiced { invoice_id } => {
                    info!("Invoiced {} - {}", ticket.code, invoice_id);
                    report.invoiced.push(ticket.code);
                }
                TicketOutcome::Skipped(reason) => {
                    debug!("Ticket {} skipped: {:?}", ticket.code, reason);
                    report.skipped += 1;
                }
                TicketOutcome::Failed(e) => {
                    log_failure(&ticket.code, &e);
                    report.failed.push((ticket.code, e.class()));
                }
            }
        }

        Ok(report)
    }

    /// Runs until a fatal condition; returns it.
    pub async fn run(&self) -> Halt {
        info!(
            "Starting invoicing loop, interval {:?}",
            self.settings.interval
        );

        loop {
            let today = Local::now().date_naive();
            match self.run_cycle(today).await {
                Ok(report) => debug!("Cycle done: {:?}", report),
                Err(halt) => return halt,
            }
            tokio::time::sleep(self.settings.interval).await;
        }
    }
}
