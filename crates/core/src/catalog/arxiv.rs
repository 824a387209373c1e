//! arXiv API client.
//!
//! arXiv asks clients to:
//! - Keep pages to a reasonable size (we default to 100 entries)
//! - Wait about three seconds between consecutive requests

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::atom::{parse_feed, ParsedFeed};
use super::{ArticleCatalog, CatalogError};
use crate::article::Article;
use crate::config::CatalogConfig;
use crate::metrics::CATALOG_REQUESTS;

/// arXiv Atom API client.
pub struct ArxivClient {
    client: Client,
    base_url: String,
    page_size: u32,
    last_request: Mutex<Option<Instant>>,
    page_delay: Duration,
}

impl ArxivClient {
    /// Create a new arXiv client.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .user_agent(format!(
                "harvester/{} (scheduled metadata harvest)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            page_size: config.page_size.max(1),
            last_request: Mutex::new(None),
            page_delay: Duration::from_millis(config.page_delay_ms),
        })
    }

    /// Wait for the politeness delay if needed.
    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.page_delay {
                let wait_time = self.page_delay - elapsed;
                debug!("arXiv rate limit: waiting {:?}", wait_time);
                sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// Fetch one page of results sorted by last update, newest first.
    async fn fetch_page(
        &self,
        query: &str,
        start: u32,
        page_size: u32,
    ) -> Result<ParsedFeed, CatalogError> {
        self.wait_for_rate_limit().await;

        debug!(
            "arXiv query: query='{}', start={}, max_results={}",
            query, start, page_size
        );

        let start = start.to_string();
        let page_size = page_size.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", query),
                ("start", start.as_str()),
                ("max_results", page_size.as_str()),
                ("sortBy", "lastUpdatedDate"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await
            .inspect_err(|_| {
                CATALOG_REQUESTS.with_label_values(&["arxiv", "error"]).inc();
            })?;

        let status = response.status();
        if status == 429 {
            warn!("arXiv rate limit exceeded (status {})", status.as_u16());
            CATALOG_REQUESTS
                .with_label_values(&["arxiv", "rate_limited"])
                .inc();
            return Err(CatalogError::RateLimitExceeded);
        }
        if !status.is_success() {
            CATALOG_REQUESTS.with_label_values(&["arxiv", "error"]).inc();
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        CATALOG_REQUESTS.with_label_values(&["arxiv", "success"]).inc();
        parse_feed(&body)
    }
}

#[async_trait]
impl ArticleCatalog for ArxivClient {
    fn name(&self) -> &str {
        "arxiv"
    }

    async fn fetch(
        &self,
        category: &str,
        max_results: u32,
    ) -> Result<Vec<Article>, CatalogError> {
        let mut articles: Vec<Article> = Vec::new();
        let mut seen = HashSet::new();
        let mut start = 0u32;

        while start < max_results {
            let page_size = self.page_size.min(max_results - start);
            let page = self.fetch_page(category, start, page_size).await?;
            let short_page = page.entries_seen < page_size as usize;

            // The listing can shift between pages; keep the first sighting.
            for article in page.articles {
                if seen.insert(article.entry_id.clone()) {
                    articles.push(article);
                }
            }

            start += page_size;
            if short_page || page.total_results.is_some_and(|total| start >= total) {
                break;
            }
        }

        info!(
            "arXiv returned {} entries for '{}' (limit {})",
            articles.len(),
            category,
            max_results
        );

        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn config() -> CatalogConfig {
        CatalogConfig {
            page_size: 0,
            page_delay_ms: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_client_creation_clamps_page_size() {
        let client = ArxivClient::new(&config()).unwrap();
        assert_eq!(client.name(), "arxiv");
        assert_eq!(client.page_size, 1);
        assert_eq!(client.base_url, "https://export.arxiv.org/api/query");
    }

    #[tokio::test]
    async fn test_first_request_does_not_wait() {
        let mut cfg = config();
        cfg.page_delay_ms = 10_000;
        let client = ArxivClient::new(&cfg).unwrap();

        let started = std::time::Instant::now();
        client.wait_for_rate_limit().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_unreachable_catalog_is_http_error() {
        let cfg = CatalogConfig {
            base_url: "http://127.0.0.1:9/api/query".to_string(),
            page_delay_ms: 0,
            timeout_secs: 2,
            ..Default::default()
        };
        let client = ArxivClient::new(&cfg).unwrap();
        let err = client.fetch("cat:cs.AI", 10).await.unwrap_err();
        assert!(matches!(err, CatalogError::HttpError(_)));
    }

    type Responder = Arc<dyn Fn(u32, u32) -> (u16, String) + Send + Sync>;

    /// Serve canned pages on a local port, recording `(start, max_results)`.
    async fn serve_pages(responder: Responder) -> (String, Arc<StdMutex<Vec<(u32, u32)>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(StdMutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }

                let head = String::from_utf8_lossy(&buf);
                let target = head.split_whitespace().nth(1).unwrap_or_default();
                let query = target.split_once('?').map(|(_, q)| q).unwrap_or_default();
                let param = |key: &str| {
                    query
                        .split('&')
                        .filter_map(|pair| pair.split_once('='))
                        .find(|(k, _)| *k == key)
                        .and_then(|(_, v)| v.parse::<u32>().ok())
                        .unwrap_or_default()
                };
                let (start, max_results) = (param("start"), param("max_results"));
                recorded.lock().unwrap().push((start, max_results));

                let (status, body) = responder(start, max_results);
                let response = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/atom+xml\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}/api/query", addr), requests)
    }

    fn feed(ids: &[&str], total: Option<u32>) -> String {
        let total = total
            .map(|t| format!("<opensearch:totalResults>{}</opensearch:totalResults>", t))
            .unwrap_or_default();
        let entries: String = ids
            .iter()
            .map(|id| {
                format!(
                    "<entry><id>{id}</id>\
                     <updated>2024-03-02T08:30:00Z</updated>\
                     <published>2024-03-01T12:00:00Z</published>\
                     <title>Paper {id}</title><summary>About {id}.</summary>\
                     <author><name>Ada Lovelace</name></author></entry>"
                )
            })
            .collect();
        format!(
            "<feed xmlns=\"http://www.w3.org/2005/Atom\" \
             xmlns:opensearch=\"http://a9.com/-/spec/opensearch/1.1/\">{}{}</feed>",
            total, entries
        )
    }

    fn local_client(base_url: String) -> ArxivClient {
        ArxivClient::new(&CatalogConfig {
            base_url,
            page_size: 2,
            page_delay_ms: 0,
            timeout_secs: 5,
            ..Default::default()
        })
        .unwrap()
    }

    fn ids(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.entry_id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_paging_caps_last_page_and_drops_repeats() {
        let (url, requests) = serve_pages(Arc::new(|start, _| {
            let page: &[&str] = match start {
                0 => &["A", "B"],
                2 => &["B", "C"],
                _ => &["D"],
            };
            (200, feed(page, Some(100)))
        }))
        .await;

        let articles = local_client(url).fetch("cat:cs.AI", 5).await.unwrap();

        assert_eq!(*requests.lock().unwrap(), vec![(0, 2), (2, 2), (4, 1)]);
        assert_eq!(ids(&articles), vec!["A", "B", "C", "D"]);
    }

    #[tokio::test]
    async fn test_paging_stops_at_short_page() {
        let (url, requests) = serve_pages(Arc::new(|start, _| {
            let page: &[&str] = if start == 0 { &["A", "B"] } else { &["C"] };
            (200, feed(page, None))
        }))
        .await;

        let articles = local_client(url).fetch("cat:cs.AI", 10).await.unwrap();

        assert_eq!(*requests.lock().unwrap(), vec![(0, 2), (2, 2)]);
        assert_eq!(ids(&articles), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_paging_stops_at_total_results() {
        let (url, requests) = serve_pages(Arc::new(|start, _| {
            let page: &[&str] = if start == 0 { &["A", "B"] } else { &["C", "D"] };
            (200, feed(page, Some(4)))
        }))
        .await;

        let articles = local_client(url).fetch("cat:cs.AI", 10).await.unwrap();

        assert_eq!(*requests.lock().unwrap(), vec![(0, 2), (2, 2)]);
        assert_eq!(ids(&articles), vec!["A", "B", "C", "D"]);
    }

    #[tokio::test]
    async fn test_status_codes_map_to_catalog_errors() {
        let (url, _) = serve_pages(Arc::new(|start, _| match start {
            0 => (429, "slow down".to_string()),
            _ => (503, "unavailable".to_string()),
        }))
        .await;
        let client = local_client(url.clone());

        let err = client.fetch("cat:cs.AI", 2).await.unwrap_err();
        assert!(matches!(err, CatalogError::RateLimitExceeded));

        // Page two of a larger fetch hits the 503 after a clean first page.
        let (url, _) = serve_pages(Arc::new(|start, _| match start {
            0 => (200, feed(&["A", "B"], None)),
            _ => (503, "unavailable".to_string()),
        }))
        .await;
        let err = local_client(url).fetch("cat:cs.AI", 4).await.unwrap_err();
        assert!(matches!(err, CatalogError::ApiError { status: 503, .. }));
    }
}
