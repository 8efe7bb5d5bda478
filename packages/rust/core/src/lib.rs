//! Company enrichment orchestration.
//!
//! Ties together search resolution, polite fetching, signal extraction,
//! classification and storage into per-company and batch workflows.

pub mod assets;
pub mod batch;
pub mod context;
pub mod orchestrator;
pub mod scan;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{
    BatchReport, ItemOutcome, ProgressReporter, SilentProgress, enrich_concurrent, enrich_many,
    run_batch,
};
pub use context::EnrichContext;
pub use orchestrator::{EnrichState, Enrichment, enrich, enrich_detailed, enrich_with_hint};
pub use scan::scan_directory;
