//! arXiv source fetcher.
//!
//! One query per run against the Atom export API, covering the target day's
//! full 24-hour update window, relevance-descending, capped. arXiv supplies
//! metadata and abstract in the same response, so no scraping is involved.

use crate::error::{DigestError, Result};
use crate::http::HttpClient;
use crate::record::{AbstractText, PaperRecord, Source};
use futures::stream::{self, Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// arXiv Atom export endpoint
const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

/// Fetches one day's updated papers from the arXiv export API.
pub struct ArxivSource {
    http: Arc<HttpClient>,
    api_url: String,
    max_results: u32,
}

impl ArxivSource {
    /// Create a fetcher capped at `max_results` records per run.
    pub fn new(http: Arc<HttpClient>, max_results: u32) -> Self {
        Self {
            http,
            api_url: ARXIV_API_URL.to_string(),
            max_results,
        }
    }

    /// Override the API endpoint (used by tests).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Records updated on `date` (YYYY-MM-DD), fetched on first poll.
    ///
    /// A failed request logs and yields an empty sequence so the run can
    /// continue with the other source.
    pub fn records<'a>(&'a self, date: &'a str) -> impl Stream<Item = PaperRecord> + 'a {
        stream::once(async move {
            match self.fetch(date).await {
                Ok(records) => records,
                Err(e) => {
                    warn!(error = %e, "arXiv request failed, yielding no records");
                    Vec::new()
                }
            }
        })
        .map(stream::iter)
        .flatten()
    }

    /// Query the export API for the day's window and parse the feed.
    async fn fetch(&self, date: &str) -> Result<Vec<PaperRecord>> {
        let compact = date.replace('-', "");
        let query = format!("lastUpdatedDate:[{}0000 TO {}2359]", compact, compact);
        debug!(query = %query, max_results = self.max_results, "Querying arXiv");

        let response = self
            .http
            .get(
                &self.api_url,
                &[
                    ("search_query", query),
                    ("sortBy", "relevance".to_string()),
                    ("sortOrder", "descending".to_string()),
                    ("max_results", self.max_results.to_string()),
                ],
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::Api {
                code: status.as_u16(),
                message: format!("arXiv query returned {}", status),
            });
        }

        let body = response.bytes().await?;
        let records = parse_feed(body.as_ref())?;
        info!(count = records.len(), date, "arXiv records fetched");
        Ok(records)
    }
}

/// Parse an Atom feed into paper records.
fn parse_feed(xml: &[u8]) -> Result<Vec<PaperRecord>> {
    let feed = feed_rs::parser::parse(xml)
        .map_err(|e| DigestError::Parse(format!("arXiv feed: {}", e)))?;

    let records = feed
        .entries
        .into_iter()
        .map(|entry| {
            let date = entry
                .updated
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "N/A".to_string());
            let title = entry
                .title
                .map(|t| normalize_whitespace(&t.content))
                .unwrap_or_default();
            let authors = entry
                .authors
                .iter()
                .map(|a| a.name.clone())
                .collect::<Vec<_>>()
                .join(", ");
            let url = entry
                .links
                .iter()
                .find(|l| l.media_type.as_deref() == Some("text/html"))
                .map(|l| l.href.clone())
                .unwrap_or_else(|| "N/A".to_string());
            let abstract_text = entry
                .summary
                .map(|s| AbstractText::Text(normalize_whitespace(&s.content)))
                .unwrap_or(AbstractText::Missing);

            PaperRecord {
                date,
                title,
                authors,
                publish: "arXiv".to_string(),
                url,
                source: Source::ArXiv,
                abstract_text,
            }
        })
        .collect();

    Ok(records)
}

/// Collapse whitespace runs; arXiv wraps titles and summaries with newlines.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const ATOM_FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: lastUpdatedDate</title>
  <id>http://arxiv.org/api/test</id>
  <updated>2025-08-23T00:00:00Z</updated>
  <entry>
    <id>http://arxiv.org/abs/2508.01234v1</id>
    <updated>2025-08-22T17:01:02Z</updated>
    <published>2025-08-21T12:00:00Z</published>
    <title>Timing-Driven
      Placement   with Graph Learning</title>
    <summary>  We study global
      placement for modern designs.  </summary>
    <author><name>Alice Zhang</name></author>
    <author><name>Bo Li</name></author>
    <link href="http://arxiv.org/abs/2508.01234v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2508.01234v1" rel="related" type="application/pdf"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2508.05678v2</id>
    <updated>2025-08-22T03:14:15Z</updated>
    <title>Sparse Solvers</title>
    <author><name>Carol Wu</name></author>
    <link title="pdf" href="http://arxiv.org/pdf/2508.05678v2" rel="related" type="application/pdf"/>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed_normalizes_fields() {
        let records = parse_feed(ATOM_FIXTURE.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.date, "2025-08-22");
        assert_eq!(first.title, "Timing-Driven Placement with Graph Learning");
        assert_eq!(first.authors, "Alice Zhang, Bo Li");
        assert_eq!(first.publish, "arXiv");
        assert_eq!(first.url, "http://arxiv.org/abs/2508.01234v1");
        assert_eq!(first.source, Source::ArXiv);
        assert_eq!(
            first.abstract_text,
            AbstractText::Text("We study global placement for modern designs.".to_string())
        );
    }

    #[test]
    fn test_parse_feed_defaults_for_missing_fields() {
        let records = parse_feed(ATOM_FIXTURE.as_bytes()).unwrap();
        let second = &records[1];

        // No text/html link and no summary in the second entry
        assert_eq!(second.url, "N/A");
        assert_eq!(second.abstract_text, AbstractText::Missing);
        assert_eq!(second.authors, "Carol Wu");
    }

    #[test]
    fn test_parse_feed_rejects_garbage() {
        assert!(parse_feed(b"this is not xml").is_err());
    }

    #[tokio::test]
    async fn test_records_queries_day_window() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded(
                    "search_query".to_string(),
                    "lastUpdatedDate:[202508220000 TO 202508222359]".to_string(),
                ),
                Matcher::UrlEncoded("sortBy".to_string(), "relevance".to_string()),
                Matcher::UrlEncoded("sortOrder".to_string(), "descending".to_string()),
                Matcher::UrlEncoded("max_results".to_string(), "5".to_string()),
            ]))
            .with_status(200)
            .with_body(ATOM_FIXTURE)
            .expect(1)
            .create_async()
            .await;

        let http = Arc::new(HttpClient::new().unwrap());
        let source = ArxivSource::new(http, 5).with_api_url(format!("{}/query", server.url()));

        let records: Vec<PaperRecord> = source.records("2025-08-22").collect().await;
        assert_eq!(records.len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_request_yields_empty_sequence() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/query")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let http = Arc::new(HttpClient::new().unwrap());
        let source = ArxivSource::new(http, 5).with_api_url(format!("{}/query", server.url()));

        let records: Vec<PaperRecord> = source.records("2025-08-22").collect().await;
        assert!(records.is_empty());
    }
}
