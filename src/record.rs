//! Paper record data model shared by the fetchers and downstream stages.
//!
//! A record's `url` is always the value originally reported by the data
//! source; landing-page resolution never rewrites it. The `abstract` field is
//! an in-band channel on the wire (text, empty, or a failure note), modeled
//! here as an explicit enum until serialization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire prefix marking an abstract slot that carries a scrape failure note
pub const SCRAPE_FAILURE_PREFIX: &str = "abstract scrape failed: ";

/// Origin family of a record, classified from its URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "arXiv")]
    ArXiv,
    #[serde(rename = "ACM")]
    Acm,
    #[serde(rename = "IEEE")]
    Ieee,
    Unknown,
}

impl Source {
    /// Classify a URL into a source family.
    ///
    /// Pure function of the URL text, independent of which API supplied the
    /// record. URLs matching neither publisher pattern stay `Unknown`.
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_lowercase();
        if lower.starts_with("https://doi.org/10.1145") || lower.contains("dl.acm.org/doi/10.1145")
        {
            Source::Acm
        } else if lower.starts_with("https://doi.org/10.1109")
            || lower.contains("ieeexplore.ieee.org")
        {
            Source::Ieee
        } else {
            Source::Unknown
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::ArXiv => "arXiv",
            Source::Acm => "ACM",
            Source::Ieee => "IEEE",
            Source::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Outcome of abstract acquisition for one record.
///
/// The wire format merges value and diagnostic into a single string field;
/// this type keeps them separate inside the pipeline and converts only at
/// the serialization boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AbstractText {
    /// Extracted abstract text (may be the publisher's literal `"None"`)
    Text(String),
    /// No abstract available; serializes as the empty string
    Missing,
    /// Scraping raised an error; the reason travels in-band as a note
    Failed(String),
}

impl AbstractText {
    /// Wrap an extractor error as an in-band failure note.
    pub fn failure(err: impl fmt::Display) -> Self {
        AbstractText::Failed(err.to_string())
    }

    /// Whether this slot carries a failure note rather than a value.
    pub fn is_failure(&self) -> bool {
        matches!(self, AbstractText::Failed(_))
    }
}

impl From<AbstractText> for String {
    fn from(value: AbstractText) -> Self {
        match value {
            AbstractText::Text(text) => text,
            AbstractText::Missing => String::new(),
            AbstractText::Failed(reason) => format!("{}{}", SCRAPE_FAILURE_PREFIX, reason),
        }
    }
}

impl From<String> for AbstractText {
    fn from(value: String) -> Self {
        if value.is_empty() {
            AbstractText::Missing
        } else if let Some(reason) = value.strip_prefix(SCRAPE_FAILURE_PREFIX) {
            AbstractText::Failed(reason.to_string())
        } else {
            AbstractText::Text(value)
        }
    }
}

impl fmt::Display for AbstractText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbstractText::Text(text) => f.write_str(text),
            AbstractText::Missing => Ok(()),
            AbstractText::Failed(reason) => write!(f, "{}{}", SCRAPE_FAILURE_PREFIX, reason),
        }
    }
}

/// One collected paper. Field order matches the output file layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Indexing/update date, source-dependent granularity, or "N/A"
    pub date: String,
    /// Title with source-provided formatting (arXiv titles are
    /// whitespace-normalized by the fetcher)
    pub title: String,
    /// Single delimited author string; joining style follows the source
    pub authors: String,
    /// Venue/container name, or "N/A"
    pub publish: String,
    /// URL exactly as reported by the source; never a resolved scrape URL
    pub url: String,
    /// Source family classified from `url` (arXiv records are tagged
    /// directly by their fetcher)
    pub source: Source,
    /// Abstract slot; see [`AbstractText`] for the wire contract
    #[serde(rename = "abstract")]
    pub abstract_text: AbstractText,
}
