//! SQLite-backed article store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection};
use tracing::{debug, warn};

use super::{BatchWriter, ExistenceOracle, StoreError};
use crate::article::{EnrichedArticle, StorageRow};
use crate::config::{is_valid_table_name, DatabaseConfig};

/// SQLite-backed article store.
///
/// A fresh connection is opened for every logical operation so that no
/// lock is held between the existence checks and the final insert.
pub struct SqliteArticleStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteArticleStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            busy_timeout: Duration::from_millis(5000),
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(&config.path).with_busy_timeout(Duration::from_millis(config.busy_timeout_ms))
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    fn checked(table: &str) -> Result<&str, StoreError> {
        if is_valid_table_name(table) {
            Ok(table)
        } else {
            Err(StoreError::InvalidTable(table.to_string()))
        }
    }

    /// Create the destination table for a category if it does not exist.
    pub fn ensure_table(&self, table: &str) -> Result<(), StoreError> {
        let table = Self::checked(table)?;
        let conn = self.open()?;
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{table}" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entry_id TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                summary TEXT NOT NULL,
                published TEXT NOT NULL,
                updated TEXT NOT NULL,
                authors TEXT NOT NULL,
                categories TEXT NOT NULL,
                comment TEXT NOT NULL DEFAULT '',
                doi TEXT NOT NULL DEFAULT '',
                journal_ref TEXT NOT NULL DEFAULT '',
                links TEXT NOT NULL DEFAULT '',
                primary_category TEXT NOT NULL DEFAULT '',
                CN_title TEXT NOT NULL,
                CN_summary TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS "idx_{table}_updated" ON "{table}"(updated);
            "#
        ))?;
        debug!(table, "Ensured article table");
        Ok(())
    }

    /// Number of rows in a table.
    pub fn count(&self, table: &str) -> Result<u64, StoreError> {
        let table = Self::checked(table)?;
        let conn = self.open()?;
        let count: i64 =
            conn.query_row(&format!(r#"SELECT COUNT(1) FROM "{table}""#), [], |row| {
                row.get(0)
            })?;
        Ok(count as u64)
    }

    /// Stored entry ids in insertion order.
    pub fn entry_ids(&self, table: &str) -> Result<Vec<String>, StoreError> {
        let table = Self::checked(table)?;
        let conn = self.open()?;
        let mut stmt = conn.prepare(&format!(r#"SELECT entry_id FROM "{table}" ORDER BY id"#))?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Stored translations for one record, if present.
    pub fn translations(
        &self,
        table: &str,
        entry_id: &str,
    ) -> Result<Option<(String, String)>, StoreError> {
        let table = Self::checked(table)?;
        let conn = self.open()?;
        let mut stmt = conn.prepare(&format!(
            r#"SELECT CN_title, CN_summary FROM "{table}" WHERE entry_id = ?1"#
        ))?;
        let mut rows = stmt.query(params![entry_id])?;
        match rows.next()? {
            Some(row) => Ok(Some((row.get(0)?, row.get(1)?))),
            None => Ok(None),
        }
    }
}

impl ExistenceOracle for SqliteArticleStore {
    fn exists(&self, entry_id: &str, table: &str) -> Result<bool, StoreError> {
        let table = Self::checked(table)?;
        let conn = self.open()?;
        let count: i64 = conn.query_row(
            &format!(r#"SELECT COUNT(1) FROM "{table}" WHERE entry_id = ?1"#),
            params![entry_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl BatchWriter for SqliteArticleStore {
    fn insert_batch(&self, table: &str, records: &[EnrichedArticle]) -> Result<usize, StoreError> {
        let table = Self::checked(table)?;
        if records.is_empty() {
            return Ok(0);
        }

        let mut conn = self.open()?;
        let tx = conn.transaction()?;

        let result = (|| -> Result<usize, StoreError> {
            let mut stmt = tx.prepare(&format!(
                r#"INSERT INTO "{table}" (
                    entry_id, title, summary, published, updated, authors, categories,
                    comment, doi, journal_ref, links, primary_category, CN_title, CN_summary
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"#
            ))?;

            for record in records {
                let row = StorageRow::from(record);
                stmt.execute(params![
                    row.entry_id,
                    row.title,
                    row.summary,
                    row.published,
                    row.updated,
                    row.authors,
                    row.categories,
                    row.comment,
                    row.doi,
                    row.journal_ref,
                    row.links,
                    row.primary_category,
                    row.cn_title,
                    row.cn_summary,
                ])?;
            }
            Ok(records.len())
        })();

        match result {
            Ok(inserted) => {
                tx.commit()?;
                Ok(inserted)
            }
            Err(e) => {
                warn!(table, error = %e, "Batch insert failed, rolling back");
                if let Err(rollback) = tx.rollback() {
                    warn!(table, error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}
