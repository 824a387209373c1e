//! Testing utilities and mock implementations.
//!
//! Mocks for every pipeline collaborator, so passes and runs can be
//! exercised without network access or a database.
//!
//! # Example
//!
//! ```rust,ignore
//! use harvester_core::testing::{fixtures, MockArticleStore, MockCatalog, MockTranslator};
//!
//! let catalog = MockCatalog::new();
//! let translator = MockTranslator::always_failing();
//! let store = MockArticleStore::new();
//!
//! catalog.set_results("cat:cs.AI", vec![fixtures::article("A1")]).await;
//! store.seed("cs_ai", fixtures::enriched("A0"));
//! ```

mod mock_catalog;
mod mock_store;
mod mock_translator;

pub use mock_catalog::{MockCatalog, RecordedFetch};
pub use mock_store::MockArticleStore;
pub use mock_translator::MockTranslator;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{TimeZone, Utc};

    use crate::article::{Article, ArticleLink, EnrichedArticle};

    /// Create a test article with reasonable defaults.
    pub fn article(entry_id: &str) -> Article {
        Article {
            entry_id: entry_id.to_string(),
            title: format!("On the Structure of {}", entry_id),
            summary: format!("We study {} and report results.", entry_id),
            authors: vec!["Ada Lovelace".to_string(), "Alan Turing".to_string()],
            categories: vec!["cs.AI".to_string(), "cs.LG".to_string()],
            comment: "10 pages".to_string(),
            doi: String::new(),
            journal_ref: String::new(),
            primary_category: "cs.AI".to_string(),
            published: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            updated: Utc.with_ymd_and_hms(2024, 3, 2, 8, 30, 0).unwrap(),
            links: vec![ArticleLink {
                href: format!("http://arxiv.org/abs/{}", entry_id),
                title: String::new(),
                rel: "alternate".to_string(),
                content_type: "text/html".to_string(),
            }],
        }
    }

    /// Create a test article that already carries translations.
    pub fn enriched(entry_id: &str) -> EnrichedArticle {
        article(entry_id).enrich(
            format!("{} 的结构", entry_id),
            format!("我们研究了 {}。", entry_id),
        )
    }

    /// Several articles with ids `{prefix}1..={count}`.
    pub fn articles(prefix: &str, count: usize) -> Vec<Article> {
        (1..=count)
            .map(|i| article(&format!("{}{}", prefix, i)))
            .collect()
    }
}
