//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Pipeline passes (outcomes, per-table article counts, duration)
//! - Translation (attempts, placeholder fallbacks)
//! - Catalog requests

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Passes finished, by outcome.
pub static PASSES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("harvester_passes_total", "Total pipeline passes"),
        &["outcome"], // "committed", "no_candidates", "nothing_new", "failed"
    )
    .unwrap()
});

/// Candidates returned by the catalog.
pub static ARTICLES_FETCHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "harvester_articles_fetched_total",
            "Candidates returned by the catalog",
        ),
        &["table"],
    )
    .unwrap()
});

/// Candidates not yet stored.
pub static ARTICLES_NEW: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "harvester_articles_new_total",
            "Candidates that passed the existence check",
        ),
        &["table"],
    )
    .unwrap()
});

/// Rows inserted.
pub static ARTICLES_COMMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("harvester_articles_committed_total", "Rows committed"),
        &["table"],
    )
    .unwrap()
});

/// Pass duration in seconds.
pub static PASS_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "harvester_pass_duration_seconds",
            "Duration of a single category pass",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 1800.0, 3600.0]),
        &["table"],
    )
    .unwrap()
});

// =============================================================================
// Translation Metrics
// =============================================================================

/// Provider calls by result.
pub static TRANSLATION_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "harvester_translation_attempts_total",
            "Translation provider calls",
        ),
        &["result"], // "success", "failure"
    )
    .unwrap()
});

/// Fields stored with the failure placeholder.
pub static TRANSLATION_FALLBACKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "harvester_translation_fallbacks_total",
            "Fields that exhausted the retry budget",
        ),
        &["field"], // "title", "summary"
    )
    .unwrap()
});

// =============================================================================
// Catalog Metrics
// =============================================================================

/// Catalog page requests by result.
pub static CATALOG_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("harvester_catalog_requests_total", "Catalog page requests"),
        &["catalog", "result"], // result: "success", "rate_limited", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Pipeline
        Box::new(PASSES_TOTAL.clone()),
        Box::new(ARTICLES_FETCHED.clone()),
        Box::new(ARTICLES_NEW.clone()),
        Box::new(ARTICLES_COMMITTED.clone()),
        Box::new(PASS_DURATION.clone()),
        // Translation
        Box::new(TRANSLATION_ATTEMPTS.clone()),
        Box::new(TRANSLATION_FALLBACKS.clone()),
        // Catalog
        Box::new(CATALOG_REQUESTS.clone()),
    ]
}
