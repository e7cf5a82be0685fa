//! Relevance selection and translation over a fetched checkpoint file.
//!
//! Reads the day's paper file, asks the LLM whether each paper aligns with
//! the configured research profile, translates the accepted titles and
//! abstracts into Chinese, and writes a `select_`-prefixed sibling file with
//! the same chunked checkpointing policy as the fetch stage.

use crate::error::Result;
use crate::llm::{extract_json, LlmClient};
use crate::prompts::{relevance, translation};
use crate::record::PaperRecord;
use crate::store::{CheckpointWriter, CHUNK_SIZE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Placeholder translation when the source text is empty or the call fails
const TRANSLATION_FALLBACK: &str = "None";

/// Research profile the relevance judgment runs against
#[derive(Debug, Clone)]
pub struct SelectOptions {
    /// Broad research field description
    pub broad_field: String,
    /// Specific subfields, already split on commas
    pub specific_fields: Vec<String>,
}

/// A fetched record accepted by the relevance judgment, with translations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedRecord {
    #[serde(flatten)]
    pub record: PaperRecord,
    pub title_zh: String,
    pub abstract_zh: String,
}

/// Derive the output path for a selection run: `select_` prepended to the
/// input file name, in the same directory.
pub fn select_output_path(input: &Path) -> PathBuf {
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match input.parent() {
        Some(dir) => dir.join(format!("select_{}", file_name)),
        None => PathBuf::from(format!("select_{}", file_name)),
    }
}

/// Run the selection stage over a fetched checkpoint file.
///
/// Papers are processed sequentially in input order. A failed or unparseable
/// judgment counts as not aligned and never aborts the stage.
pub async fn run_select(
    input: &Path,
    llm: &LlmClient,
    options: &SelectOptions,
) -> Result<PathBuf> {
    let raw = fs::read_to_string(input)?;
    let papers: Vec<PaperRecord> = serde_json::from_str(&raw)?;
    let total = papers.len();

    info!(
        count = total,
        input = %input.display(),
        broad_field = %options.broad_field,
        "Starting relevance selection"
    );

    let out_path = select_output_path(input);
    let mut writer = CheckpointWriter::create(out_path, CHUNK_SIZE)?;
    let mut selected: Vec<SelectedRecord> = Vec::new();

    for (idx, record) in papers.into_iter().enumerate() {
        let abstract_wire: String = record.abstract_text.clone().into();

        let aligned = if record.title.is_empty() && abstract_wire.is_empty() {
            false
        } else {
            judge_relevance(llm, options, &record.title, &abstract_wire).await
        };

        info!(
            verdict = if aligned { "YES" } else { "NO" },
            position = idx + 1,
            total,
            title = %record.title,
            "Paper judged"
        );

        if !aligned {
            continue;
        }

        let title_zh = translate(llm, &record.title).await;
        let abstract_zh = translate(llm, &abstract_wire).await;

        selected.push(SelectedRecord {
            record,
            title_zh,
            abstract_zh,
        });
        writer.maybe_flush(&selected)?;
    }

    writer.finalize(&selected)?;

    info!(
        total,
        accepted = selected.len(),
        path = %writer.path().display(),
        "Selection complete"
    );

    Ok(writer.path().to_path_buf())
}

/// Ask the LLM whether a paper aligns with the research profile.
///
/// Any API or parse failure is treated as not aligned.
async fn judge_relevance(
    llm: &LlmClient,
    options: &SelectOptions,
    title: &str,
    abstract_text: &str,
) -> bool {
    let specific_fields = if options.specific_fields.is_empty() {
        "various subfields".to_string()
    } else {
        options.specific_fields.join(", ")
    };
    let title = if title.is_empty() { "No Title" } else { title };
    let abstract_text = if abstract_text.is_empty() {
        "No Abstract"
    } else {
        abstract_text
    };

    let user_prompt =
        relevance::build_user_prompt(&options.broad_field, &specific_fields, title, abstract_text);

    match llm.chat(relevance::SYSTEM_PROMPT, &user_prompt).await {
        Ok(content) => parse_verdict(&content),
        Err(e) => {
            warn!(error = %e, "Relevance judgment failed - treating as not aligned");
            false
        }
    }
}

/// Parse the strict-JSON verdict out of raw model output
fn parse_verdict(content: &str) -> bool {
    #[derive(Deserialize)]
    struct Verdict {
        aligned: bool,
    }

    let json_str = extract_json(content);
    match serde_json::from_str::<Verdict>(&json_str) {
        Ok(verdict) => verdict.aligned,
        Err(e) => {
            let preview: String = content.chars().take(200).collect();
            info!(
                error = %e,
                content_preview = %preview,
                "Verdict parse failed - treating as not aligned"
            );
            false
        }
    }
}

/// Translate English text to Chinese, falling back to a placeholder.
async fn translate(llm: &LlmClient, text: &str) -> String {
    if text.is_empty() {
        return TRANSLATION_FALLBACK.to_string();
    }

    match llm.chat(translation::SYSTEM_PROMPT, text).await {
        Ok(result) => {
            let trimmed = result.trim();
            if trimmed.is_empty() {
                TRANSLATION_FALLBACK.to_string()
            } else {
                trimmed.to_string()
            }
        }
        Err(e) => {
            warn!(error = %e, "Translation failed");
            debug!(text = %text.chars().take(80).collect::<String>(), "Untranslated text");
            TRANSLATION_FALLBACK.to_string()
        }
    }
}
