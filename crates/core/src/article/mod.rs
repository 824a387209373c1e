//! Article records as they move through the harvest pipeline.
//!
//! A candidate [`Article`] comes straight from the catalog. Translation turns
//! it into an [`EnrichedArticle`], which is the only shape the store accepts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored in place of a translation that exhausted its retry budget.
pub const TRANSLATION_FAILED: &str = "Translation failed.";

/// Separator used when flattening list fields into a single column.
pub const LIST_SEPARATOR: &str = ",";

/// A link attached to a catalog entry (abstract page, PDF, DOI, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleLink {
    pub href: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub rel: String,
    #[serde(default)]
    pub content_type: String,
}

impl ArticleLink {
    /// `href,title,rel,content_type`, missing parts left empty.
    pub fn to_storage(&self) -> String {
        [
            self.href.as_str(),
            self.title.as_str(),
            self.rel.as_str(),
            self.content_type.as_str(),
        ]
        .join(LIST_SEPARATOR)
    }
}

/// A candidate record yielded by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Stable external identifier, the deduplication key.
    pub entry_id: String,
    pub title: String,
    pub summary: String,
    /// Author names in byline order.
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub doi: String,
    #[serde(default)]
    pub journal_ref: String,
    #[serde(default)]
    pub primary_category: String,
    pub published: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub links: Vec<ArticleLink>,
}

impl Article {
    /// Attach translations, producing a record that can be persisted.
    pub fn enrich(
        self,
        cn_title: impl Into<String>,
        cn_summary: impl Into<String>,
    ) -> EnrichedArticle {
        EnrichedArticle {
            article: self,
            cn_title: cn_title.into(),
            cn_summary: cn_summary.into(),
        }
    }
}

/// A candidate with both translation fields populated (success or sentinel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedArticle {
    pub article: Article,
    pub cn_title: String,
    pub cn_summary: String,
}

impl EnrichedArticle {
    pub fn entry_id(&self) -> &str {
        &self.article.entry_id
    }

    /// True when either field fell back to [`TRANSLATION_FAILED`].
    pub fn has_translation_fallback(&self) -> bool {
        self.cn_title == TRANSLATION_FAILED || self.cn_summary == TRANSLATION_FAILED
    }
}

/// Column values for one stored row, in table column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRow {
    pub entry_id: String,
    pub title: String,
    pub summary: String,
    pub published: String,
    pub updated: String,
    pub authors: String,
    pub categories: String,
    pub comment: String,
    pub doi: String,
    pub journal_ref: String,
    pub links: String,
    pub primary_category: String,
    pub cn_title: String,
    pub cn_summary: String,
}

impl From<&EnrichedArticle> for StorageRow {
    fn from(record: &EnrichedArticle) -> Self {
        let a = &record.article;
        Self {
            entry_id: a.entry_id.clone(),
            title: a.title.clone(),
            summary: a.summary.clone(),
            published: a.published.to_rfc3339(),
            updated: a.updated.to_rfc3339(),
            authors: a.authors.join(LIST_SEPARATOR),
            categories: a.categories.join(LIST_SEPARATOR),
            comment: a.comment.clone(),
            doi: a.doi.clone(),
            journal_ref: a.journal_ref.clone(),
            links: a
                .links
                .iter()
                .map(ArticleLink::to_storage)
                .collect::<Vec<_>>()
                .join(LIST_SEPARATOR),
            primary_category: a.primary_category.clone(),
            cn_title: record.cn_title.clone(),
            cn_summary: record.cn_summary.clone(),
        }
    }
}
