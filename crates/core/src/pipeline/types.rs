//! Types for the harvest pipeline.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::store::StoreError;

/// A step of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Fetch,
    Filter,
    Enrich,
    Commit,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Fetch => "fetch",
            PipelineStage::Filter => "filter",
            PipelineStage::Enrich => "enrich",
            PipelineStage::Commit => "commit",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a single pass.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Catalog could not be queried.
    #[error("fetch failed: {0}")]
    Fetch(#[from] CatalogError),

    /// Existence check failed; the pass stops rather than assume "new".
    #[error("existence check failed for {entry_id}: {source}")]
    Filter {
        entry_id: String,
        #[source]
        source: StoreError,
    },

    /// Batch insert failed and was rolled back.
    #[error("commit failed: {0}")]
    Commit(#[source] StoreError),
}

impl PipelineError {
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::Fetch(_) => PipelineStage::Fetch,
            PipelineError::Filter { .. } => PipelineStage::Filter,
            PipelineError::Commit(_) => PipelineStage::Commit,
        }
    }
}

/// How a pass ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PassOutcome {
    /// New records were inserted.
    Committed,
    /// The catalog returned nothing.
    NoCandidates,
    /// Every candidate was already stored.
    NothingNew,
    /// A stage failed; nothing from this pass was stored.
    Failed { stage: PipelineStage, error: String },
}

impl PassOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassOutcome::Committed => "committed",
            PassOutcome::NoCandidates => "no_candidates",
            PassOutcome::NothingNew => "nothing_new",
            PassOutcome::Failed { .. } => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, PassOutcome::Failed { .. })
    }
}

/// Counts for one (category, table) pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
    pub category: String,
    pub table: String,
    /// Candidates returned by the catalog.
    pub fetched: usize,
    /// Candidates not yet stored.
    pub new: usize,
    /// Rows actually inserted.
    pub committed: usize,
    /// Records where at least one field holds the failure placeholder.
    pub translation_fallbacks: usize,
    pub outcome: PassOutcome,
}

impl PassSummary {
    pub(crate) fn new(category: &str, table: &str) -> Self {
        Self {
            category: category.to_string(),
            table: table.to_string(),
            fetched: 0,
            new: 0,
            committed: 0,
            translation_fallbacks: 0,
            outcome: PassOutcome::NoCandidates,
        }
    }
}

/// Result of running every configured pass once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub passes: Vec<PassSummary>,
}

impl RunReport {
    pub fn total_committed(&self) -> usize {
        self.passes.iter().map(|p| p.committed).sum()
    }

    pub fn failed_passes(&self) -> usize {
        self.passes.iter().filter(|p| p.outcome.is_failure()).count()
    }
}
