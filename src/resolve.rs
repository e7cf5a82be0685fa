//! DOI extraction and landing-page resolution.
//!
//! Crossref reports DOI-redirect URLs (`https://doi.org/10.x/...`) while the
//! abstract extractors need the publisher's concrete landing page. Resolution
//! is two-tier: the Crossref works API first (cheap, not always populated),
//! then HEAD redirect-following. Resolution never mutates the record's stored
//! URL and never fails; every miss falls back to the input.

use crate::http::HttpClient;
use regex::Regex;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Crossref works API base for DOI lookups
const CROSSREF_WORKS_API: &str = "https://api.crossref.org/works";

/// DOI pattern: 4-9 digit registrant prefix, non-whitespace/non-quote suffix
const DOI_PATTERN: &str = r#"10\.\d{4,9}/[^\s<>"']+"#;

/// Extract the first DOI-shaped substring, if any.
pub fn extract_doi(input: &str) -> Option<String> {
    let re = Regex::new(DOI_PATTERN).ok()?;
    re.find(input).map(|m| m.as_str().to_string())
}

/// Publisher families with scrapeable landing pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publisher {
    Acm,
    Ieee,
}

impl Publisher {
    /// Host+path fragment a canonical landing page contains.
    fn landing_marker(self) -> &'static str {
        match self {
            Publisher::Acm => "dl.acm.org/doi/10.1145",
            Publisher::Ieee => "ieeexplore.ieee.org",
        }
    }

    /// Redirect-URL fragment for this publisher's DOI prefix.
    fn doi_marker(self) -> &'static str {
        match self {
            Publisher::Acm => "doi.org/10.1145",
            Publisher::Ieee => "doi.org/10.1109",
        }
    }

    /// Whether `url` is already this publisher's landing page.
    pub fn is_landing_page(self, url: &str) -> bool {
        url.to_lowercase().contains(self.landing_marker())
    }

    /// Whether `url` is a DOI redirect for this publisher's prefix.
    pub fn is_doi_redirect(self, url: &str) -> bool {
        url.to_lowercase().contains(self.doi_marker())
    }
}

/// Counters for the network paths the resolver has taken.
#[derive(Debug, Default)]
struct ResolveStats {
    works_lookups: AtomicU64,
    head_follows: AtomicU64,
}

/// Point-in-time copy of the resolver counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveStatsSnapshot {
    /// Works API lookups issued
    pub works_lookups: u64,
    /// HEAD redirect follows issued
    pub head_follows: u64,
}

impl ResolveStats {
    fn record_lookup(&self) {
        self.works_lookups.fetch_add(1, Ordering::Relaxed);
    }

    fn record_follow(&self) {
        self.head_follows.fetch_add(1, Ordering::Relaxed);
    }

    fn get(&self) -> ResolveStatsSnapshot {
        ResolveStatsSnapshot {
            works_lookups: self.works_lookups.load(Ordering::Relaxed),
            head_follows: self.head_follows.load(Ordering::Relaxed),
        }
    }
}

/// Resolves DOI-bearing URLs to publisher landing pages for scraping.
pub struct LandingResolver {
    http: Arc<HttpClient>,
    works_api: String,
    stats: ResolveStats,
}

impl LandingResolver {
    /// Create a resolver backed by the shared HTTP client.
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self {
            http,
            works_api: CROSSREF_WORKS_API.to_string(),
            stats: ResolveStats::default(),
        }
    }

    /// Override the works API base URL (used by tests).
    pub fn with_works_api(mut self, base: impl Into<String>) -> Self {
        self.works_api = base.into();
        self
    }

    /// Resolve the URL the extractor should fetch for `publisher`.
    ///
    /// Canonical landing pages are returned unchanged with zero network
    /// calls. DOI-redirect URLs go through the works API, with the result
    /// accepted only when it matches the publisher's landing shape, then
    /// fall back to HEAD redirect-following. Anything else, including every
    /// resolution failure, returns the input unchanged.
    pub async fn scrape_url(&self, publisher: Publisher, raw_url: &str) -> String {
        if raw_url.is_empty() || publisher.is_landing_page(raw_url) {
            return raw_url.to_string();
        }

        if publisher.is_doi_redirect(raw_url) {
            if let Some(doi) = extract_doi(raw_url) {
                if let Some(resolved) = self.resolve_via_works(&doi).await {
                    if publisher.is_landing_page(&resolved) {
                        debug!(%doi, url = %resolved, "Landing page resolved via works API");
                        return resolved;
                    }
                    debug!(%doi, url = %resolved, "Works API URL does not match landing shape");
                }
            }
            if let Some(followed) = self.follow_redirect(raw_url).await {
                return followed;
            }
        }

        raw_url.to_string()
    }

    /// Look a DOI up in the works API and read the `URL` field. Any failure
    /// (network, status, parse, missing field) yields `None`.
    async fn resolve_via_works(&self, doi: &str) -> Option<String> {
        self.stats.record_lookup();
        let url = format!("{}/{}", self.works_api, doi);
        let response = self.http.get(&url, &[]).await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let lookup: WorksLookup = response.json().await.ok()?;
        lookup.message.url
    }

    /// HEAD the URL, following redirects, and return the final location.
    async fn follow_redirect(&self, url: &str) -> Option<String> {
        self.stats.record_follow();
        let response = self.http.head(url).await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        Some(response.url().to_string())
    }

    /// Snapshot of the lookup/follow counters.
    pub fn stats(&self) -> ResolveStatsSnapshot {
        self.stats.get()
    }
}

// === Works API response types ===

#[derive(Debug, Deserialize)]
struct WorksLookup {
    message: WorksUrl,
}

#[derive(Debug, Deserialize)]
struct WorksUrl {
    #[serde(rename = "URL", default)]
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_for(server: &mockito::Server) -> LandingResolver {
        let http = Arc::new(HttpClient::new().unwrap());
        LandingResolver::new(http).with_works_api(format!("{}/works", server.url()))
    }

    #[test]
    fn test_extract_doi() {
        assert_eq!(
            extract_doi("https://doi.org/10.1145/3611643.3616256"),
            Some("10.1145/3611643.3616256".to_string())
        );
        assert_eq!(
            extract_doi(r#"<a href="https://doi.org/10.1109/TC.2024.1">x</a>"#),
            Some("10.1109/TC.2024.1".to_string())
        );
        assert_eq!(extract_doi("https://example.com/no-doi-here"), None);
        // Registrant prefix must be 4-9 digits
        assert_eq!(extract_doi("10.123/too-short"), None);
        assert_eq!(extract_doi(""), None);
    }

    #[test]
    fn test_publisher_url_shapes() {
        assert!(Publisher::Acm.is_landing_page("https://dl.acm.org/doi/10.1145/123"));
        assert!(!Publisher::Acm.is_landing_page("https://doi.org/10.1145/123"));
        assert!(Publisher::Acm.is_doi_redirect("https://doi.org/10.1145/123"));
        assert!(Publisher::Ieee.is_landing_page("https://ieeexplore.ieee.org/document/99"));
        assert!(Publisher::Ieee.is_doi_redirect("https://doi.org/10.1109/TC.1"));
        assert!(!Publisher::Ieee.is_doi_redirect("https://doi.org/10.1145/123"));
    }

    #[tokio::test]
    async fn test_canonical_landing_url_needs_no_network() {
        // Unroutable works base: any lookup attempt would fail loudly
        let http = Arc::new(HttpClient::new().unwrap());
        let resolver = LandingResolver::new(http).with_works_api("http://127.0.0.1:9/works");

        let url = "https://dl.acm.org/doi/10.1145/3611643.3616256";
        assert_eq!(resolver.scrape_url(Publisher::Acm, url).await, url);

        let stats = resolver.stats();
        assert_eq!(stats.works_lookups, 0);
        assert_eq!(stats.head_follows, 0);
    }

    #[tokio::test]
    async fn test_works_result_matching_landing_shape_accepted() {
        let mut server = mockito::Server::new_async().await;
        let works = server
            .mock("GET", "/works/10.1145/3611643.3616256")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":{"URL":"https://dl.acm.org/doi/10.1145/3611643.3616256"}}"#)
            .expect(1)
            .create_async()
            .await;

        let resolver = resolver_for(&server);
        let raw = format!("{}/doi.org/10.1145/3611643.3616256", server.url());
        let resolved = resolver.scrape_url(Publisher::Acm, &raw).await;

        assert_eq!(resolved, "https://dl.acm.org/doi/10.1145/3611643.3616256");
        let stats = resolver.stats();
        assert_eq!(stats.works_lookups, 1);
        assert_eq!(stats.head_follows, 0);
        works.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_matching_works_result_falls_back_to_redirect() {
        let mut server = mockito::Server::new_async().await;
        let works = server
            .mock("GET", "/works/10.1109/TC.2024.1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":{"URL":"https://example.com/not-the-landing-page"}}"#)
            .expect(1)
            .create_async()
            .await;
        let redirect = server
            .mock("HEAD", "/doi.org/10.1109/TC.2024.1")
            .with_status(302)
            .with_header("location", "/xplore/document/12345")
            .expect(1)
            .create_async()
            .await;
        let landing = server
            .mock("HEAD", "/xplore/document/12345")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let resolver = resolver_for(&server);
        let raw = format!("{}/doi.org/10.1109/TC.2024.1", server.url());
        let resolved = resolver.scrape_url(Publisher::Ieee, &raw).await;

        assert_eq!(resolved, format!("{}/xplore/document/12345", server.url()));
        let stats = resolver.stats();
        assert_eq!(stats.works_lookups, 1);
        assert_eq!(stats.head_follows, 1);
        works.assert_async().await;
        redirect.assert_async().await;
        landing.assert_async().await;
    }

    #[tokio::test]
    async fn test_all_tiers_failing_returns_original() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/works/10.1109/TC.2024.2")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("HEAD", "/doi.org/10.1109/TC.2024.2")
            .with_status(404)
            .create_async()
            .await;

        let resolver = resolver_for(&server);
        let raw = format!("{}/doi.org/10.1109/TC.2024.2", server.url());
        assert_eq!(resolver.scrape_url(Publisher::Ieee, &raw).await, raw);
    }
}
