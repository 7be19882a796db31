//! Batch orchestrator.
//!
//! Walks flattened manifest entries group by group, strictly in order, and
//! drives each item through resolve, transfer, upload and cleanup. A failing
//! item is logged and recorded; the batch always runs to the end.
//!
//! Each group gets a scratch directory for its lifetime. Empty groups are
//! skipped before any directory is created.

mod probe;
mod report;
mod runner;
mod scratch;
mod state;

pub use probe::{probe, ProbeError, ProbeReport};
pub use report::{BatchSummary, ItemReport};
pub use runner::BatchRunner;
pub use scratch::ScratchDir;
pub use state::{IllegalTransition, ItemState, Stage};
