//! Article persistence: existence checks and atomic batch inserts.

mod sqlite;

pub use sqlite::SqliteArticleStore;

use thiserror::Error;

use crate::article::EnrichedArticle;

/// Errors from the article store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Table name is not a plain SQL identifier.
    #[error("Invalid table name: {0}")]
    InvalidTable(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Answers whether a record is already stored.
///
/// A failed lookup is an error, never "absent".
pub trait ExistenceOracle: Send + Sync {
    fn exists(&self, entry_id: &str, table: &str) -> Result<bool, StoreError>;
}

/// Inserts a batch of enriched records in one transaction.
pub trait BatchWriter: Send + Sync {
    /// Returns the number of rows committed. On error nothing is committed.
    fn insert_batch(&self, table: &str, records: &[EnrichedArticle]) -> Result<usize, StoreError>;
}
