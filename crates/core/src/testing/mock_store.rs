//! In-memory article store for testing.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::article::EnrichedArticle;
use crate::store::{BatchWriter, ExistenceOracle, StoreError};

#[derive(Debug, Default)]
struct StoreState {
    tables: HashMap<String, Vec<EnrichedArticle>>,
    exists_error: Option<String>,
    insert_error: Option<String>,
    exists_calls: usize,
    insert_calls: usize,
}

/// Mock implementation of ExistenceOracle and BatchWriter.
///
/// Inserts behave like a unique `entry_id` column: a batch containing a
/// duplicate is rejected whole.
#[derive(Debug, Default)]
pub struct MockArticleStore {
    state: Mutex<StoreState>,
}

impl MockArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a record in a table without counting it as an insert call.
    pub fn seed(&self, table: &str, record: EnrichedArticle) {
        let mut state = self.state.lock().unwrap();
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(record);
    }

    /// Make every existence check fail until cleared.
    pub fn fail_exists(&self, message: &str) {
        self.state.lock().unwrap().exists_error = Some(message.to_string());
    }

    /// Make every batch insert fail until cleared.
    pub fn fail_insert(&self, message: &str) {
        self.state.lock().unwrap().insert_error = Some(message.to_string());
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.exists_error = None;
        state.insert_error = None;
    }

    pub fn entry_ids(&self, table: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .map(|rows| rows.iter().map(|r| r.entry_id().to_string()).collect())
            .unwrap_or_default()
    }

    pub fn records(&self, table: &str) -> Vec<EnrichedArticle> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn exists_calls(&self) -> usize {
        self.state.lock().unwrap().exists_calls
    }

    pub fn insert_calls(&self) -> usize {
        self.state.lock().unwrap().insert_calls
    }
}

impl ExistenceOracle for MockArticleStore {
    fn exists(&self, entry_id: &str, table: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.exists_calls += 1;
        if let Some(message) = &state.exists_error {
            return Err(StoreError::Database(message.clone()));
        }
        Ok(state
            .tables
            .get(table)
            .is_some_and(|rows| rows.iter().any(|r| r.entry_id() == entry_id)))
    }
}

impl BatchWriter for MockArticleStore {
    fn insert_batch(&self, table: &str, records: &[EnrichedArticle]) -> Result<usize, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.insert_calls += 1;
        if let Some(message) = &state.insert_error {
            return Err(StoreError::Database(message.clone()));
        }

        let rows = state.tables.entry(table.to_string()).or_default();
        let mut seen: HashSet<&str> = rows.iter().map(|r| r.entry_id()).collect();
        for record in records {
            if !seen.insert(record.entry_id()) {
                return Err(StoreError::Database(format!(
                    "UNIQUE constraint failed: {}.entry_id",
                    table
                )));
            }
        }

        rows.extend(records.iter().cloned());
        Ok(records.len())
    }
}
