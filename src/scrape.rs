//! Source-specific abstract extraction from publisher landing pages.
//!
//! Two strategies, both brittle by nature (publisher markup changes break
//! them silently): ACM needs a rendered page and yields the first
//! paragraph-role element; IEEE embeds a metadata object in an inline script
//! that a plain GET can read. "Not found" is a normal outcome for both.

use crate::error::{DigestError, Result};
use crate::http::HttpClient;
use crate::render::PageRenderer;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::spawn_blocking;

/// Literal the ACM extractor reports when no paragraph element exists
const NO_PARAGRAPH_SENTINEL: &str = "None";

/// Pause after an IEEE page fetch to stay under rate limits
const IEEE_FETCH_DELAY: Duration = Duration::from_secs(2);

/// Abstract extraction from rendered ACM landing pages.
pub struct AcmScraper {
    renderer: Arc<dyn PageRenderer>,
}

impl AcmScraper {
    /// Create a scraper around the injected renderer.
    pub fn new(renderer: Arc<dyn PageRenderer>) -> Self {
        Self { renderer }
    }

    /// Render the landing page and extract the abstract paragraph.
    ///
    /// Returns the literal `"None"` when the page has no paragraph-role
    /// element. Rendering failures propagate for the caller to contain.
    pub async fn fetch_abstract(&self, url: &str) -> Result<String> {
        let renderer = Arc::clone(&self.renderer);
        let target = url.to_string();
        let html = spawn_blocking(move || renderer.render(&target))
            .await
            .map_err(|e| DigestError::Render(format!("render task: {}", e)))??;

        Ok(extract_paragraph(&html).unwrap_or_else(|| NO_PARAGRAPH_SENTINEL.to_string()))
    }
}

/// First paragraph-role element's text, embedded markup stripped.
fn extract_paragraph(html: &str) -> Option<String> {
    let selector = Selector::parse(r#"div[role="paragraph"]"#).ok()?;
    let document = Html::parse_document(html);
    let element = document.select(&selector).next()?;
    Some(element.text().collect::<String>().trim().to_string())
}

/// Abstract extraction from IEEE Xplore document pages.
pub struct IeeeScraper {
    http: Arc<HttpClient>,
}

impl IeeeScraper {
    /// Create a scraper backed by the shared HTTP client.
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    /// Fetch the page and read the abstract out of the embedded metadata.
    ///
    /// `None` when the metadata block is absent, unparseable, or has no
    /// abstract field. Request failures propagate for the caller to contain.
    pub async fn fetch_abstract(&self, url: &str) -> Result<Option<String>> {
        let response = self.http.get(url, &[]).await?;
        let html = response.text().await?;
        tokio::time::sleep(IEEE_FETCH_DELAY).await;

        Ok(extract_embedded_abstract(&html))
    }
}

/// Abstract field of the inline `xplGlobal.document.metadata` assignment.
fn extract_embedded_abstract(html: &str) -> Option<String> {
    let re = Regex::new(r"(?s)xplGlobal\.document\.metadata\s*=\s*(\{.*?\});").ok()?;
    let payload = re.captures(html)?.get(1)?;
    let metadata: serde_json::Value = serde_json::from_str(payload.as_str()).ok()?;
    metadata
        .get("abstract")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubRenderer {
        html: String,
    }

    impl PageRenderer for StubRenderer {
        fn render(&self, _url: &str) -> Result<String> {
            Ok(self.html.clone())
        }
    }

    struct FailingRenderer;

    impl PageRenderer for FailingRenderer {
        fn render(&self, _url: &str) -> Result<String> {
            Err(DigestError::Render("tab crashed".to_string()))
        }
    }

    #[test]
    fn test_extract_paragraph_strips_markup() {
        let html = r#"<html><body>
            <div class="hero">intro</div>
            <div role="paragraph">Graph <b>neural</b> networks improve <i>routing</i>.</div>
            <div role="paragraph">Second paragraph ignored.</div>
        </body></html>"#;

        assert_eq!(
            extract_paragraph(html),
            Some("Graph neural networks improve routing.".to_string())
        );
    }

    #[test]
    fn test_extract_paragraph_absent() {
        assert_eq!(extract_paragraph("<html><body><p>no role</p></body></html>"), None);
    }

    #[tokio::test]
    async fn test_acm_missing_paragraph_yields_sentinel() {
        let renderer = Arc::new(StubRenderer {
            html: "<html><body><div>just chrome</div></body></html>".to_string(),
        });
        let scraper = AcmScraper::new(renderer);

        let abstract_text = scraper
            .fetch_abstract("https://dl.acm.org/doi/10.1145/123")
            .await
            .unwrap();
        assert_eq!(abstract_text, "None");
    }

    #[tokio::test]
    async fn test_acm_render_failure_propagates() {
        let scraper = AcmScraper::new(Arc::new(FailingRenderer));

        let err = scraper
            .fetch_abstract("https://dl.acm.org/doi/10.1145/123")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("tab crashed"));
    }

    #[test]
    fn test_extract_embedded_abstract() {
        let html = r#"<html><script>
            xplGlobal.document.metadata={"userInfo":{"inst":false},
            "abstract":"We present a timing analyzer.","isJournal":true};
        </script></html>"#;

        assert_eq!(
            extract_embedded_abstract(html),
            Some("We present a timing analyzer.".to_string())
        );
    }

    #[test]
    fn test_extract_embedded_abstract_edge_cases() {
        // No metadata assignment at all
        assert_eq!(extract_embedded_abstract("<html><body></body></html>"), None);
        // Assignment present but not valid JSON
        assert_eq!(
            extract_embedded_abstract("xplGlobal.document.metadata = {broken};"),
            None
        );
        // Valid metadata without an abstract field
        assert_eq!(
            extract_embedded_abstract(r#"xplGlobal.document.metadata={"title":"x"};"#),
            None
        );
    }

    #[tokio::test]
    async fn test_ieee_fetch_reads_embedded_metadata() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/document/12345/")
            .with_status(200)
            .with_body(
                r#"<html><script>xplGlobal.document.metadata={"abstract":"Low-power design."};</script></html>"#,
            )
            .expect(1)
            .create_async()
            .await;

        let scraper = IeeeScraper::new(Arc::new(HttpClient::new().unwrap()));
        let result = scraper
            .fetch_abstract(&format!("{}/document/12345/", server.url()))
            .await
            .unwrap();

        assert_eq!(result, Some("Low-power design.".to_string()));
        mock.assert_async().await;
    }
}
