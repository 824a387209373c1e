//! Pipeline orchestrator implementation.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::types::{PassOutcome, PassSummary, PipelineError, PipelineStage, RunReport};
use crate::article::{Article, EnrichedArticle};
use crate::catalog::ArticleCatalog;
use crate::config::{CatalogConfig, CategoryMapping};
use crate::metrics;
use crate::store::{BatchWriter, ExistenceOracle};
use crate::translator::TranslationService;

/// Runs harvest passes for every configured (category, table) pair.
pub struct PipelineOrchestrator {
    mappings: Vec<CategoryMapping>,
    max_results: u32,
    catalog: Arc<dyn ArticleCatalog>,
    oracle: Arc<dyn ExistenceOracle>,
    writer: Arc<dyn BatchWriter>,
    translation: Arc<TranslationService>,
}

impl PipelineOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        mappings: Vec<CategoryMapping>,
        max_results: u32,
        catalog: Arc<dyn ArticleCatalog>,
        oracle: Arc<dyn ExistenceOracle>,
        writer: Arc<dyn BatchWriter>,
        translation: Arc<TranslationService>,
    ) -> Self {
        Self {
            mappings,
            max_results,
            catalog,
            oracle,
            writer,
            translation,
        }
    }

    /// Mappings and fetch limit from the `[catalog]` section.
    pub fn from_config(
        config: &CatalogConfig,
        catalog: Arc<dyn ArticleCatalog>,
        oracle: Arc<dyn ExistenceOracle>,
        writer: Arc<dyn BatchWriter>,
        translation: Arc<TranslationService>,
    ) -> Self {
        Self::new(
            config.categories.clone(),
            config.max_results,
            catalog,
            oracle,
            writer,
            translation,
        )
    }

    pub fn mappings(&self) -> &[CategoryMapping] {
        &self.mappings
    }

    /// Run one pass per mapping, in order.
    ///
    /// A failed pass is logged and recorded in the report; the remaining
    /// mappings still run.
    pub async fn run_all(&self) -> RunReport {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!(run_id = %run_id, passes = self.mappings.len(), "Starting harvest run");

        let mut passes = Vec::with_capacity(self.mappings.len());
        for mapping in &self.mappings {
            let category = mapping.query();
            let mut summary = PassSummary::new(&category, &mapping.table);

            if let Err(e) = self.execute_pass(&category, &mapping.table, &mut summary).await {
                let stage = e.stage();
                error!(
                    category = %category,
                    table = %mapping.table,
                    stage = stage.as_str(),
                    "Pass failed: {}",
                    e
                );
                summary.outcome = PassOutcome::Failed {
                    stage,
                    error: e.to_string(),
                };
            }

            metrics::PASSES_TOTAL
                .with_label_values(&[summary.outcome.as_str()])
                .inc();
            passes.push(summary);
        }

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            passes,
        };

        info!(
            run_id = %report.run_id,
            committed = report.total_committed(),
            failed = report.failed_passes(),
            "Harvest run finished"
        );

        report
    }

    /// Run Fetch, Filter, Enrich and Commit for a single mapping.
    pub async fn run_pass(&self, mapping: &CategoryMapping) -> Result<PassSummary, PipelineError> {
        let category = mapping.query();
        let mut summary = PassSummary::new(&category, &mapping.table);
        self.execute_pass(&category, &mapping.table, &mut summary)
            .await?;
        Ok(summary)
    }

    async fn execute_pass(
        &self,
        category: &str,
        table: &str,
        summary: &mut PassSummary,
    ) -> Result<(), PipelineError> {
        let started = Instant::now();
        let result = self.fetch_filter_enrich_commit(category, table, summary).await;
        metrics::PASS_DURATION
            .with_label_values(&[table])
            .observe(started.elapsed().as_secs_f64());
        result
    }

    async fn fetch_filter_enrich_commit(
        &self,
        category: &str,
        table: &str,
        summary: &mut PassSummary,
    ) -> Result<(), PipelineError> {
        // Fetch
        let candidates = self.catalog.fetch(category, self.max_results).await?;
        summary.fetched = candidates.len();
        metrics::ARTICLES_FETCHED
            .with_label_values(&[table])
            .inc_by(candidates.len() as u64);
        info!(
            category,
            table,
            stage = PipelineStage::Fetch.as_str(),
            fetched = candidates.len(),
            "Fetched candidates from {}",
            self.catalog.name()
        );

        if candidates.is_empty() {
            info!(category, table, "No candidates, skipping");
            summary.outcome = PassOutcome::NoCandidates;
            return Ok(());
        }

        // Filter
        let fresh = self.filter_new(table, candidates)?;
        summary.new = fresh.len();
        metrics::ARTICLES_NEW
            .with_label_values(&[table])
            .inc_by(fresh.len() as u64);
        info!(
            category,
            table,
            stage = PipelineStage::Filter.as_str(),
            new = fresh.len(),
            "Filtered out already stored candidates"
        );

        if fresh.is_empty() {
            info!(category, table, "Nothing new, skipping");
            summary.outcome = PassOutcome::NothingNew;
            return Ok(());
        }

        // Enrich
        let enriched = self.enrich(category, table, fresh).await;
        summary.translation_fallbacks = enriched
            .iter()
            .filter(|r| r.has_translation_fallback())
            .count();

        // Commit
        let committed = self
            .writer
            .insert_batch(table, &enriched)
            .map_err(PipelineError::Commit)?;
        summary.committed = committed;
        summary.outcome = PassOutcome::Committed;
        metrics::ARTICLES_COMMITTED
            .with_label_values(&[table])
            .inc_by(committed as u64);
        info!(
            category,
            table,
            stage = PipelineStage::Commit.as_str(),
            committed,
            fallbacks = summary.translation_fallbacks,
            "Committed {} new records",
            committed
        );

        Ok(())
    }

    fn filter_new(
        &self,
        table: &str,
        candidates: Vec<Article>,
    ) -> Result<Vec<Article>, PipelineError> {
        let mut accepted = HashSet::new();
        let mut fresh = Vec::new();
        for article in candidates {
            if accepted.contains(&article.entry_id) {
                debug!(table, entry_id = %article.entry_id, "Duplicate candidate in fetch");
                continue;
            }
            let exists = self
                .oracle
                .exists(&article.entry_id, table)
                .map_err(|source| PipelineError::Filter {
                    entry_id: article.entry_id.clone(),
                    source,
                })?;
            if exists {
                debug!(table, entry_id = %article.entry_id, "Already stored");
            } else {
                accepted.insert(article.entry_id.clone());
                fresh.push(article);
            }
        }
        Ok(fresh)
    }

    async fn enrich(
        &self,
        category: &str,
        table: &str,
        fresh: Vec<Article>,
    ) -> Vec<EnrichedArticle> {
        let total = fresh.len();
        let mut enriched = Vec::with_capacity(total);
        for (i, article) in fresh.into_iter().enumerate() {
            info!(
                category,
                table,
                stage = PipelineStage::Enrich.as_str(),
                entry_id = %article.entry_id,
                "Translating {}/{}",
                i + 1,
                total
            );
            let record = self.translation.enrich(article).await;
            if record.has_translation_fallback() {
                warn!(
                    category,
                    table,
                    stage = PipelineStage::Enrich.as_str(),
                    entry_id = %record.entry_id(),
                    "Storing record with translation placeholder"
                );
            }
            enriched.push(record);
        }
        enriched
    }
}
