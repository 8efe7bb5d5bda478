//! Batch drivers: sequential and bounded-concurrency enrichment of many names.
//!
//! Every input yields exactly one [`ItemOutcome`]. A failing company is logged
//! and recorded as skipped; the batch always continues. The JSON mirror is
//! rewritten once, after the last company.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use companyintel_fetch::Clock;
use companyintel_shared::{CompanyRecord, CompanyStatus, Result};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{error, info, instrument, warn};

use crate::context::EnrichContext;
use crate::orchestrator::{Enrichment, enrich_detailed};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// What happened to one input name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Enriched {
        name: String,
        domain: Option<String>,
        status: CompanyStatus,
        cached: bool,
    },
    Skipped {
        name: String,
        reason: String,
    },
}

impl ItemOutcome {
    pub fn name(&self) -> &str {
        match self {
            Self::Enriched { name, .. } | Self::Skipped { name, .. } => name,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// Result of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Records produced, in input order (skipped names have none).
    pub records: Vec<CompanyRecord>,
    /// One entry per input name, in input order.
    pub outcomes: Vec<ItemOutcome>,
    /// Records written to the JSON mirror.
    pub exported: usize,
}

impl BatchReport {
    pub fn enriched_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_skipped()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| o.is_skipped())
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for batch runs.
pub trait ProgressReporter: Send + Sync {
    /// Called once before the first company.
    fn started(&self, total: usize);
    /// Called when a company begins processing.
    fn company_started(&self, name: &str, current: usize, total: usize);
    /// Called when a company finishes, successfully or not.
    fn company_finished(&self, outcome: &ItemOutcome, done: usize, total: usize);
    /// Called after the export.
    fn finished(&self, report: &BatchReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn started(&self, _total: usize) {}
    fn company_started(&self, _name: &str, _current: usize, _total: usize) {}
    fn company_finished(&self, _outcome: &ItemOutcome, _done: usize, _total: usize) {}
    fn finished(&self, _report: &BatchReport) {}
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

/// Enrich `names` one after another, then export once.
///
/// Only the export can fail the batch; per-company failures become
/// [`ItemOutcome::Skipped`].
#[instrument(skip_all, fields(total = names.len()))]
pub async fn enrich_many(
    ctx: &EnrichContext,
    names: &[String],
    progress: &dyn ProgressReporter,
) -> Result<BatchReport> {
    let clock = ctx.clock();
    let mut report = run_batch(
        names,
        clock.as_ref(),
        ctx.config.polite_sleep,
        progress,
        |name| async move { enrich_detailed(ctx, &name, None).await },
    )
    .await;

    report.exported = ctx.store.export_all(&ctx.config.export_path).await?;
    log_summary(&report);
    progress.finished(&report);
    Ok(report)
}

/// Enrich `names` on up to `concurrency` tasks, then export once.
///
/// Outcomes keep input order. Requests to one domain still run one at a time.
#[instrument(skip_all, fields(total = names.len(), concurrency))]
pub async fn enrich_concurrent(
    ctx: Arc<EnrichContext>,
    names: Vec<String>,
    concurrency: usize,
    progress: Arc<dyn ProgressReporter>,
) -> Result<BatchReport> {
    let total = names.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let finished = Arc::new(AtomicUsize::new(0));
    progress.started(total);

    let mut handles = Vec::with_capacity(total);
    for (index, name) in names.iter().cloned().enumerate() {
        let ctx = ctx.clone();
        let semaphore = semaphore.clone();
        let progress = progress.clone();
        let finished = finished.clone();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            progress.company_started(&name, index + 1, total);

            let result = if name.trim().is_empty() {
                None
            } else {
                Some(enrich_detailed(&ctx, &name, None).await)
            };
            let (outcome, enrichment) = settle(&name, result);

            if enrichment.as_ref().is_some_and(|e| e.network) {
                ctx.clock().sleep(ctx.config.polite_sleep).await;
            }

            let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
            progress.company_finished(&outcome, done, total);
            (outcome, enrichment.map(|e| e.record))
        }));
    }

    let mut report = BatchReport::default();
    for (handle, name) in handles.into_iter().zip(names) {
        match handle.await {
            Ok((outcome, record)) => {
                report.outcomes.push(outcome);
                report.records.extend(record);
            }
            Err(e) => {
                warn!(company = %name, error = %e, "enrichment task failed");
                report.outcomes.push(ItemOutcome::Skipped {
                    name,
                    reason: format!("task failed: {e}"),
                });
            }
        }
    }

    report.exported = ctx.store.export_all(&ctx.config.export_path).await?;
    log_summary(&report);
    progress.finished(&report);
    Ok(report)
}

/// Sequential batch loop around a per-company step.
///
/// Blank names are skipped without calling `enrich_one`. After each
/// enrichment that touched the network the loop sleeps `polite_sleep`.
pub async fn run_batch<F, Fut>(
    names: &[String],
    clock: &dyn Clock,
    polite_sleep: Duration,
    progress: &dyn ProgressReporter,
    mut enrich_one: F,
) -> BatchReport
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Enrichment>>,
{
    let total = names.len();
    let mut report = BatchReport::default();
    progress.started(total);

    for (index, name) in names.iter().enumerate() {
        progress.company_started(name, index + 1, total);

        let result = if name.trim().is_empty() {
            None
        } else {
            Some(enrich_one(name.clone()).await)
        };
        let (outcome, enrichment) = settle(name, result);

        if let Some(enrichment) = enrichment {
            if enrichment.network {
                clock.sleep(polite_sleep).await;
            }
            report.records.push(enrichment.record);
        }

        progress.company_finished(&outcome, index + 1, total);
        report.outcomes.push(outcome);
    }

    report
}

/// Turn one company's result into its outcome. `None` means the name was blank.
fn settle(
    name: &str,
    result: Option<Result<Enrichment>>,
) -> (ItemOutcome, Option<Enrichment>) {
    match result {
        None => {
            warn!(company = %name, "blank company name skipped");
            (
                ItemOutcome::Skipped {
                    name: name.to_string(),
                    reason: "blank company name".into(),
                },
                None,
            )
        }
        Some(Err(e)) => {
            if e.is_persistence() {
                error!(company = %name, error = %e, "company skipped: store write failed");
            } else {
                warn!(company = %name, error = %e, "company skipped");
            }
            (
                ItemOutcome::Skipped {
                    name: name.to_string(),
                    reason: e.to_string(),
                },
                None,
            )
        }
        Some(Ok(enrichment)) => (
            ItemOutcome::Enriched {
                name: name.trim().to_string(),
                domain: enrichment.record.domain.clone(),
                status: enrichment.record.status,
                cached: enrichment.cached,
            },
            Some(enrichment),
        ),
    }
}

fn log_summary(report: &BatchReport) {
    info!(
        enriched = report.enriched_count(),
        skipped = report.skipped_count(),
        exported = report.exported,
        "batch complete"
    );
}
