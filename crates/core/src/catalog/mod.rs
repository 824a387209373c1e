//! Catalog client for the external article source.
//!
//! The catalog yields candidate [`Article`]s for a category query, newest
//! updated first. Ordering is only a hint to callers; every candidate is
//! still checked against the store before any work is spent on it.

mod arxiv;
mod atom;

pub use arxiv::ArxivClient;
pub use atom::{parse_feed, ParsedFeed};

use async_trait::async_trait;
use thiserror::Error;

use crate::article::Article;

/// Errors that can occur when querying the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// The catalog answered with an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Response body was not a feed we understand.
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// Source of candidate articles.
#[async_trait]
pub trait ArticleCatalog: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Fetch up to `max_results` candidates for a category query, newest
    /// updated first, with no repeated `entry_id`.
    async fn fetch(&self, category: &str, max_results: u32)
        -> Result<Vec<Article>, CatalogError>;
}
