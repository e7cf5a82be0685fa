//! Ingestion orchestrator.
//!
//! Drives the arXiv fetcher to exhaustion, then the Crossref fetcher, into
//! one ordered collection with chunk-aligned checkpoints and a final
//! unconditional write. Source failures degrade the run (fewer records);
//! only checkpoint I/O failures abort it.

use crate::arxiv::ArxivSource;
use crate::crossref::CrossrefSource;
use crate::error::Result;
use crate::http::HttpClient;
use crate::record::PaperRecord;
use crate::render::{ChromiumRenderer, PageRenderer};
use crate::store::{CheckpointWriter, CHUNK_SIZE};
use futures::pin_mut;
use futures::stream::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Tunables for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Target date (YYYY-MM-DD); both sources query this day
    pub date: String,
    /// arXiv result cap
    pub arxiv_count: u32,
    /// Crossref row cap
    pub crossref_count: u32,
    /// Courtesy contact for the Crossref query
    pub mailto: String,
    /// Directory receiving `paper<date>.json`
    pub out_dir: PathBuf,
}

/// Checkpoint file path for a date under the output directory.
pub fn paper_path(out_dir: &Path, date: &str) -> PathBuf {
    out_dir.join(format!("paper{}.json", date))
}

/// Run the full ingestion for one day and return the output path.
pub async fn run(options: &IngestOptions) -> Result<PathBuf> {
    let http = Arc::new(HttpClient::new()?);
    let renderer: Arc<dyn PageRenderer> = Arc::new(ChromiumRenderer::new());
    run_with(options, http, renderer).await
}

/// [`run`] with an injected client and renderer.
pub async fn run_with(
    options: &IngestOptions,
    http: Arc<HttpClient>,
    renderer: Arc<dyn PageRenderer>,
) -> Result<PathBuf> {
    let arxiv = ArxivSource::new(Arc::clone(&http), options.arxiv_count);
    let crossref = CrossrefSource::new(
        http,
        renderer,
        options.crossref_count,
        options.mailto.clone(),
    );

    let out_path = paper_path(&options.out_dir, &options.date);
    let mut writer = CheckpointWriter::create(out_path, CHUNK_SIZE)?;

    let records = arxiv
        .records(&options.date)
        .chain(crossref.records(&options.date));
    let collected = collect_with_checkpoints(records, &mut writer).await?;

    info!(
        total = collected.len(),
        path = %writer.path().display(),
        "Ingestion complete"
    );
    Ok(writer.path().to_path_buf())
}

/// Consume a record stream into one ordered collection, checkpointing at
/// chunk boundaries and finishing with an unconditional write.
///
/// Generic over the stream so tests can feed synthetic sequences.
pub async fn collect_with_checkpoints<S>(
    records: S,
    writer: &mut CheckpointWriter,
) -> Result<Vec<PaperRecord>>
where
    S: Stream<Item = PaperRecord>,
{
    pin_mut!(records);

    let mut collected: Vec<PaperRecord> = Vec::new();
    while let Some(record) = records.next().await {
        info!(
            source = %record.source,
            date = %record.date,
            title = %record.title,
            "Record collected"
        );
        collected.push(record);
        writer.maybe_flush(&collected)?;
    }
    writer.finalize(&collected)?;

    Ok(collected)
}
