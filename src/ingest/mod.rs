//! Feed ingestion: one feed per tick, persisted as posts.
//!
//! [`Ingestor::run_cycle`] selects the feed that has waited longest,
//! stamps it, fetches it and stores its items. [`Scheduler`] calls it once
//! per [`Trigger`] signal until shutdown.

mod cycle;
mod scheduler;

pub use cycle::{CycleError, CycleReport, Ingestor};
pub use scheduler::{IntervalTrigger, ManualTrigger, RunSummary, Scheduler, Trigger};
