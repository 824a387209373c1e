//! Harvest pipeline.
//!
//! Each configured (category, table) pair gets one pass per run:
//! - **Fetch**: candidates from the catalog
//! - **Filter**: drop anything the store already holds
//! - **Enrich**: translate title and abstract of each survivor
//! - **Commit**: insert the enriched batch atomically
//!
//! Pairs run one after another and a failed pass never stops the next one.

mod orchestrator;
mod types;

pub use orchestrator::PipelineOrchestrator;
pub use types::{PassOutcome, PassSummary, PipelineError, PipelineStage, RunReport};
