pub mod article;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod metrics;
pub mod pipeline;
pub mod scheduler;
pub mod store;
pub mod testing;
pub mod translator;

pub use article::{Article, ArticleLink, EnrichedArticle, StorageRow, TRANSLATION_FAILED};
pub use auth::{ApiKeyGuard, AuthError};
pub use catalog::{ArticleCatalog, ArxivClient, CatalogError};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, CategoryMapping, Config,
    ConfigError, SanitizedConfig,
};
pub use pipeline::{
    PassOutcome, PassSummary, PipelineError, PipelineOrchestrator, PipelineStage, RunReport,
};
pub use scheduler::{Scheduler, SchedulerError, SchedulerStatus};
pub use store::{BatchWriter, ExistenceOracle, SqliteArticleStore, StoreError};
pub use translator::{
    OpenAiTranslator, RetryOn, RetryPolicy, TranslationError, TranslationField,
    TranslationService, Translator,
};
