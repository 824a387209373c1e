//! Atom feed parsing for arXiv query responses.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::warn;

use super::CatalogError;
use crate::article::{Article, ArticleLink};

/// arXiv reports query errors as a regular entry under this id prefix.
const ERROR_ENTRY_PREFIX: &str = "http://arxiv.org/api/errors";

/// One page of query results.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    /// `opensearch:totalResults`, when present.
    pub total_results: Option<u32>,
    /// Number of `<entry>` elements seen, including ones that were skipped.
    pub entries_seen: usize,
    pub articles: Vec<Article>,
}

/// Fields collected while inside an `<entry>`.
#[derive(Debug, Default)]
struct EntryBuilder {
    id: String,
    title: String,
    summary: String,
    published: String,
    updated: String,
    authors: Vec<String>,
    categories: Vec<String>,
    primary_category: String,
    comment: String,
    doi: String,
    journal_ref: String,
    links: Vec<ArticleLink>,
}

impl EntryBuilder {
    fn build(self) -> Result<Article, String> {
        if self.id.is_empty() {
            return Err("entry has no id".to_string());
        }
        let published = parse_timestamp(&self.published).ok_or_else(|| {
            format!(
                "entry {} has invalid published '{}'",
                self.id, self.published
            )
        })?;
        // Fresh submissions carry identical stamps; fall back rather than drop.
        let updated = parse_timestamp(&self.updated).unwrap_or(published);

        Ok(Article {
            entry_id: self.id,
            title: normalize_ws(&self.title),
            summary: normalize_ws(&self.summary),
            authors: self.authors,
            categories: self.categories,
            comment: normalize_ws(&self.comment),
            doi: self.doi,
            journal_ref: normalize_ws(&self.journal_ref),
            primary_category: self.primary_category,
            published,
            updated,
            links: self.links,
        })
    }
}

/// Which text-bearing element we are inside, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    Updated,
    AuthorName,
    Comment,
    Doi,
    JournalRef,
    TotalResults,
}

/// Parse an arXiv Atom response into candidate articles.
///
/// Entries without a usable id or publication date are skipped with a
/// warning. An arXiv error entry turns into [`CatalogError::ApiError`].
pub fn parse_feed(xml: &str) -> Result<ParsedFeed, CatalogError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut feed = ParsedFeed::default();
    let mut entry: Option<EntryBuilder> = None;
    let mut in_author = false;
    let mut field: Option<Field> = None;
    let mut text = String::new();
    let mut saw_feed = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            CatalogError::ParseError(format!(
                "XML error at {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"feed" => saw_feed = true,
                    b"entry" => {
                        entry = Some(EntryBuilder::default());
                        feed.entries_seen += 1;
                    }
                    b"author" if entry.is_some() => in_author = true,
                    other => {
                        if let Some(builder) = entry.as_mut() {
                            collect_attributes(builder, other, &e);
                        }
                        field = text_field(other, entry.is_some(), in_author);
                    }
                }
                text.clear();
            }
            Event::Empty(e) => {
                if let Some(builder) = entry.as_mut() {
                    collect_attributes(builder, e.local_name().as_ref(), &e);
                }
            }
            Event::Text(t) => {
                if field.is_some() {
                    let unescaped = t
                        .unescape()
                        .map_err(|e| CatalogError::ParseError(e.to_string()))?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(t) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Event::End(e) => {
                match e.local_name().as_ref() {
                    b"entry" => {
                        if let Some(builder) = entry.take() {
                            if builder.id.starts_with(ERROR_ENTRY_PREFIX) {
                                return Err(CatalogError::ApiError {
                                    status: 400,
                                    message: normalize_ws(&builder.summary),
                                });
                            }
                            match builder.build() {
                                Ok(article) => feed.articles.push(article),
                                Err(reason) => warn!("Skipping catalog entry: {}", reason),
                            }
                        }
                    }
                    b"author" => in_author = false,
                    _ => {
                        if let Some(f) = field.take() {
                            store_text(&mut feed, entry.as_mut(), f, text.trim());
                        }
                    }
                }
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_feed {
        return Err(CatalogError::ParseError(
            "response is not an Atom feed".to_string(),
        ));
    }

    Ok(feed)
}

fn text_field(name: &[u8], in_entry: bool, in_author: bool) -> Option<Field> {
    if !in_entry {
        return (name == b"totalResults").then_some(Field::TotalResults);
    }
    if in_author {
        return (name == b"name").then_some(Field::AuthorName);
    }
    match name {
        b"id" => Some(Field::Id),
        b"title" => Some(Field::Title),
        b"summary" => Some(Field::Summary),
        b"published" => Some(Field::Published),
        b"updated" => Some(Field::Updated),
        b"comment" => Some(Field::Comment),
        b"doi" => Some(Field::Doi),
        b"journal_ref" => Some(Field::JournalRef),
        _ => None,
    }
}

fn store_text(feed: &mut ParsedFeed, entry: Option<&mut EntryBuilder>, field: Field, text: &str) {
    let Some(builder) = entry else {
        if field == Field::TotalResults {
            feed.total_results = text.parse().ok();
        }
        return;
    };
    match field {
        Field::Id => builder.id = text.to_string(),
        Field::Title => builder.title = text.to_string(),
        Field::Summary => builder.summary = text.to_string(),
        Field::Published => builder.published = text.to_string(),
        Field::Updated => builder.updated = text.to_string(),
        Field::AuthorName => {
            if !text.is_empty() {
                builder.authors.push(normalize_ws(text));
            }
        }
        Field::Comment => builder.comment = text.to_string(),
        Field::Doi => builder.doi = text.to_string(),
        Field::JournalRef => builder.journal_ref = text.to_string(),
        Field::TotalResults => {}
    }
}

fn collect_attributes(builder: &mut EntryBuilder, name: &[u8], e: &BytesStart<'_>) {
    match name {
        b"link" => {
            if let Some(href) = attr(e, b"href") {
                builder.links.push(ArticleLink {
                    href,
                    title: attr(e, b"title").unwrap_or_default(),
                    rel: attr(e, b"rel").unwrap_or_default(),
                    content_type: attr(e, b"type").unwrap_or_default(),
                });
            }
        }
        b"primary_category" => {
            if let Some(term) = attr(e, b"term") {
                builder.primary_category = term;
            }
        }
        b"category" => {
            if let Some(term) = attr(e, b"term") {
                if !builder.categories.contains(&term) {
                    builder.categories.push(term);
                }
            }
        }
        _ => {}
    }
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Collapse runs of whitespace (arXiv hard-wraps titles and abstracts).
fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
