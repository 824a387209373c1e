//! Mock article catalog for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::article::Article;
use crate::catalog::{ArticleCatalog, CatalogError};

/// A recorded catalog query for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFetch {
    pub category: String,
    pub max_results: u32,
}

/// Mock implementation of the ArticleCatalog trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable candidates per category query
/// - Track fetches for assertions
/// - Simulate failures and slow responses
///
/// # Example
///
/// ```rust,ignore
/// use harvester_core::testing::{MockCatalog, fixtures};
///
/// let catalog = MockCatalog::new();
/// catalog.set_results("cat:cs.AI", vec![fixtures::article("A1")]).await;
///
/// let articles = catalog.fetch("cat:cs.AI", 500).await?;
/// assert_eq!(articles.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockCatalog {
    /// Candidates by category query.
    results: Arc<RwLock<HashMap<String, Vec<Article>>>>,
    /// One-shot errors by category query.
    errors: Arc<RwLock<HashMap<String, CatalogError>>>,
    /// Recorded fetches.
    fetches: Arc<RwLock<Vec<RecordedFetch>>>,
    /// Simulated latency for every fetch.
    delay: Arc<RwLock<Option<Duration>>>,
}

impl MockCatalog {
    /// Create a new empty mock catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the candidates returned for a category query.
    pub async fn set_results(&self, category: &str, articles: Vec<Article>) {
        self.results
            .write()
            .await
            .insert(category.to_string(), articles);
    }

    /// Make the next fetch for a category query fail.
    pub async fn set_error(&self, category: &str, error: CatalogError) {
        self.errors
            .write()
            .await
            .insert(category.to_string(), error);
    }

    /// Delay every fetch by this much.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Get all recorded fetches.
    pub async fn recorded_fetches(&self) -> Vec<RecordedFetch> {
        self.fetches.read().await.clone()
    }

    /// Number of fetches made.
    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }
}

#[async_trait]
impl ArticleCatalog for MockCatalog {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(
        &self,
        category: &str,
        max_results: u32,
    ) -> Result<Vec<Article>, CatalogError> {
        self.fetches.write().await.push(RecordedFetch {
            category: category.to_string(),
            max_results,
        });

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.errors.write().await.remove(category) {
            return Err(error);
        }

        Ok(self
            .results
            .read()
            .await
            .get(category)
            .map(|articles| {
                articles
                    .iter()
                    .take(max_results as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
