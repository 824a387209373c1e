//! Pipeline integration tests against a real SQLite store.
//!
//! These tests cover the guarantees a harvest run gives:
//! idempotent re-runs, unique identifiers, translation never blocking
//! ingestion, all-or-nothing batches and isolated per-category failures.

use std::sync::Arc;

use tempfile::TempDir;

use harvester_core::{
    catalog::CatalogError,
    store::{BatchWriter, ExistenceOracle, StoreError},
    testing::{fixtures, MockArticleStore, MockCatalog, MockTranslator},
    CategoryMapping, PassOutcome, PipelineOrchestrator, PipelineStage, RetryPolicy,
    SqliteArticleStore, TranslationService, Translator, TRANSLATION_FAILED,
};

/// Test helper wiring mocks around a file-backed store.
struct TestHarness {
    catalog: Arc<MockCatalog>,
    store: Arc<SqliteArticleStore>,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new(tables: &[&str]) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(SqliteArticleStore::new(temp_dir.path().join("harvest.db")));
        for table in tables {
            store.ensure_table(table).expect("Failed to create table");
        }

        Self {
            catalog: Arc::new(MockCatalog::new()),
            store,
            _temp_dir: temp_dir,
        }
    }

    fn orchestrator(
        &self,
        mappings: Vec<CategoryMapping>,
        translator: Arc<dyn Translator>,
    ) -> PipelineOrchestrator {
        self.orchestrator_with(mappings, translator, self.store.clone())
    }

    fn orchestrator_with(
        &self,
        mappings: Vec<CategoryMapping>,
        translator: Arc<dyn Translator>,
        oracle: Arc<dyn ExistenceOracle>,
    ) -> PipelineOrchestrator {
        let translation = Arc::new(TranslationService::new(translator, RetryPolicy::default()));
        PipelineOrchestrator::new(
            mappings,
            500,
            self.catalog.clone(),
            oracle,
            self.store.clone(),
            translation,
        )
    }
}

fn ai() -> CategoryMapping {
    CategoryMapping::new("cs.AI", "cs_ai")
}

fn cl() -> CategoryMapping {
    CategoryMapping::new("cs.CL", "cs_cl")
}

/// Oracle that never finds anything, to force conflicts at insert time.
struct BlindOracle;

impl ExistenceOracle for BlindOracle {
    fn exists(&self, _entry_id: &str, _table: &str) -> Result<bool, StoreError> {
        Ok(false)
    }
}

#[tokio::test]
async fn test_second_run_on_unchanged_catalog_adds_nothing() {
    let h = TestHarness::new(&["cs_ai", "cs_cl"]);
    h.catalog
        .set_results("cat:cs.AI", fixtures::articles("AI", 3))
        .await;
    h.catalog
        .set_results("cat:cs.CL", fixtures::articles("CL", 2))
        .await;
    let translator = Arc::new(MockTranslator::new());
    let orchestrator = h.orchestrator(vec![ai(), cl()], translator.clone());

    let first = orchestrator.run_all().await;
    assert_eq!(first.total_committed(), 5);
    let calls_after_first = translator.call_count().await;

    let second = orchestrator.run_all().await;

    assert_eq!(second.total_committed(), 0);
    assert!(second
        .passes
        .iter()
        .all(|p| p.outcome == PassOutcome::NothingNew));
    assert_eq!(h.store.count("cs_ai").unwrap(), 3);
    assert_eq!(h.store.count("cs_cl").unwrap(), 2);
    assert_eq!(translator.call_count().await, calls_after_first);
}

#[tokio::test]
async fn test_overlapping_fetches_never_duplicate_identifiers() {
    let h = TestHarness::new(&["cs_ai"]);
    let orchestrator = h.orchestrator(vec![ai()], Arc::new(MockTranslator::new()));

    h.catalog
        .set_results("cat:cs.AI", vec![fixtures::article("A1"), fixtures::article("A2")])
        .await;
    orchestrator.run_all().await;

    h.catalog
        .set_results(
            "cat:cs.AI",
            vec![
                fixtures::article("A3"),
                fixtures::article("A2"),
                fixtures::article("A1"),
            ],
        )
        .await;
    let report = orchestrator.run_all().await;

    assert_eq!(report.passes[0].fetched, 3);
    assert_eq!(report.passes[0].new, 1);
    let mut ids = h.store.entry_ids("cs_ai").unwrap();
    assert_eq!(ids.len(), 3);
    ids.dedup();
    assert_eq!(ids, vec!["A1", "A2", "A3"]);
}

#[tokio::test]
async fn test_failing_translator_still_commits_with_placeholder() {
    let h = TestHarness::new(&["cs_ai"]);
    h.catalog
        .set_results("cat:cs.AI", vec![fixtures::article("A1")])
        .await;
    let translator = Arc::new(MockTranslator::always_failing());
    let orchestrator = h.orchestrator(vec![ai()], translator.clone());

    let summary = orchestrator.run_pass(&ai()).await.unwrap();

    assert_eq!(summary.committed, 1);
    assert_eq!(summary.translation_fallbacks, 1);
    let (title, abstract_text) = h.store.translations("cs_ai", "A1").unwrap().unwrap();
    assert_eq!(title, TRANSLATION_FAILED);
    assert_eq!(abstract_text, TRANSLATION_FAILED);
}

#[tokio::test]
async fn test_each_field_is_attempted_exactly_three_times() {
    let h = TestHarness::new(&["cs_ai"]);
    h.catalog
        .set_results("cat:cs.AI", vec![fixtures::article("A1")])
        .await;
    let translator = Arc::new(MockTranslator::always_failing());
    let orchestrator = h.orchestrator(vec![ai()], translator.clone());

    orchestrator.run_pass(&ai()).await.unwrap();

    let prompts = translator.prompts().await;
    assert_eq!(prompts.len(), 6);
    assert!(prompts[..3].iter().all(|p| p.contains("文献标题")));
    assert!(prompts[3..].iter().all(|p| p.contains("文献摘要")));
}

#[tokio::test]
async fn test_batch_failing_partway_leaves_no_rows() {
    let h = TestHarness::new(&["cs_ai"]);
    // A3 is already stored but the blind oracle lets it through, so the
    // insert fails on the third row of four.
    h.store
        .insert_batch("cs_ai", &[fixtures::enriched("A3")])
        .unwrap();
    h.catalog
        .set_results("cat:cs.AI", fixtures::articles("A", 4))
        .await;
    let orchestrator =
        h.orchestrator_with(vec![ai()], Arc::new(MockTranslator::new()), Arc::new(BlindOracle));

    let report = orchestrator.run_all().await;

    assert!(matches!(
        report.passes[0].outcome,
        PassOutcome::Failed {
            stage: PipelineStage::Commit,
            ..
        }
    ));
    assert_eq!(report.passes[0].committed, 0);
    assert_eq!(h.store.entry_ids("cs_ai").unwrap(), vec!["A3"]);
}

#[tokio::test]
async fn test_only_unseen_candidate_is_translated_and_committed() {
    let h = TestHarness::new(&["cs_ai"]);
    h.store
        .insert_batch("cs_ai", &[fixtures::enriched("A1")])
        .unwrap();
    h.catalog
        .set_results("cat:cs.AI", vec![fixtures::article("A1"), fixtures::article("A2")])
        .await;
    let translator = Arc::new(MockTranslator::new());
    let orchestrator = h.orchestrator(vec![ai()], translator.clone());
    let before = h.store.count("cs_ai").unwrap();

    let summary = orchestrator.run_pass(&ai()).await.unwrap();

    assert_eq!(h.store.count("cs_ai").unwrap(), before + 1);
    assert_eq!(summary.new, 1);
    assert_eq!(summary.committed, 1);
    let prompts = translator.prompts().await;
    assert_eq!(prompts.len(), 2);
    assert!(prompts.iter().all(|p| p.contains("A2") && !p.contains("A1")));
}

#[tokio::test]
async fn test_empty_catalog_touches_nothing_and_moves_on() {
    let catalog = Arc::new(MockCatalog::new());
    let store = Arc::new(MockArticleStore::new());
    let translator = Arc::new(MockTranslator::new());
    catalog
        .set_results("cat:cs.CL", vec![fixtures::article("B1")])
        .await;
    let orchestrator = PipelineOrchestrator::new(
        vec![ai(), cl()],
        500,
        catalog.clone(),
        store.clone(),
        store.clone(),
        Arc::new(TranslationService::new(
            translator.clone(),
            RetryPolicy::default(),
        )),
    );

    let first = orchestrator.run_pass(&ai()).await.unwrap();
    assert_eq!(first.outcome, PassOutcome::NoCandidates);
    assert_eq!(store.exists_calls(), 0);
    assert_eq!(store.insert_calls(), 0);
    assert_eq!(translator.call_count().await, 0);

    let report = orchestrator.run_all().await;
    assert_eq!(report.passes[0].outcome, PassOutcome::NoCandidates);
    assert_eq!(report.passes[1].outcome, PassOutcome::Committed);
    assert_eq!(store.entry_ids("cs_cl"), vec!["B1"]);
}

#[tokio::test]
async fn test_fetch_failure_does_not_stop_other_categories() {
    let h = TestHarness::new(&["cs_ai", "cs_cl"]);
    h.catalog
        .set_error("cat:cs.AI", CatalogError::RateLimitExceeded)
        .await;
    h.catalog
        .set_results("cat:cs.CL", fixtures::articles("CL", 2))
        .await;
    let orchestrator = h.orchestrator(vec![ai(), cl()], Arc::new(MockTranslator::new()));

    let report = orchestrator.run_all().await;

    assert_eq!(report.failed_passes(), 1);
    assert_eq!(h.store.count("cs_ai").unwrap(), 0);
    assert_eq!(h.store.count("cs_cl").unwrap(), 2);
}

#[tokio::test]
async fn test_unreadable_store_fails_the_category_instead_of_reprocessing() {
    // cs_cl's table was never created, so every existence check errors.
    let h = TestHarness::new(&["cs_ai"]);
    h.catalog
        .set_results("cat:cs.CL", fixtures::articles("CL", 2))
        .await;
    h.catalog
        .set_results("cat:cs.AI", fixtures::articles("AI", 1))
        .await;
    let translator = Arc::new(MockTranslator::new());
    let orchestrator = h.orchestrator(vec![cl(), ai()], translator.clone());

    let report = orchestrator.run_all().await;

    assert!(matches!(
        report.passes[0].outcome,
        PassOutcome::Failed {
            stage: PipelineStage::Filter,
            ..
        }
    ));
    assert_eq!(report.passes[1].outcome, PassOutcome::Committed);
    // Only AI1's title and abstract were translated.
    assert_eq!(translator.call_count().await, 2);
}
