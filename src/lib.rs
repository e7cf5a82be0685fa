//! # paperdaily
//!
//! Daily academic-paper discovery pipeline: fetch new arXiv and Crossref
//! papers for a date, scrape publisher abstracts, select the relevant ones
//! with an LLM, translate them, and email a digest.
//!
//! ## Modules
//!
//! - [`arxiv`] - arXiv Atom API source
//! - [`crossref`] - Crossref works API source with abstract scraping
//! - [`resolve`] - DOI to publisher landing-page resolution
//! - [`scrape`] - ACM / IEEE abstract extractors
//! - [`render`] - Headless-browser page rendering
//! - [`ingest`] - Fetch-stage orchestration and checkpointing
//! - [`select`] - LLM relevance selection and translation
//! - [`mail`] - HTML digest and failure-notice delivery
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use paperdaily::ingest::{self, IngestOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let options = IngestOptions {
//!         date: "2025-08-22".to_string(),
//!         arxiv_count: 5,
//!         crossref_count: 5,
//!         mailto: "staff@example.org".to_string(),
//!         out_dir: "papers".into(),
//!     };
//!     let path = ingest::run(&options).await?;
//!     println!("Wrote {}", path.display());
//!     Ok(())
//! }
//! ```

pub mod arxiv;
pub mod crossref;
pub mod error;
pub mod http;
pub mod ingest;
pub mod llm;
pub mod mail;
pub mod prompts;
pub mod record;
pub mod render;
pub mod resolve;
pub mod scrape;
pub mod select;
pub mod store;

pub use error::{DigestError, Result};
