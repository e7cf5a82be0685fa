//! Checkpointed JSON persistence for collected records.
//!
//! Every flush rewrites the whole file as one complete JSON array, so a
//! crash mid-run leaves the last consistent checkpoint on disk and loses at
//! most one chunk of unsaved records. The writer owns its path for the
//! duration of a run; there is no concurrent writer.

use crate::error::Result;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Records accumulated between checkpoint writes
pub const CHUNK_SIZE: usize = 10;

/// Serialize `records` to `path` as one complete JSON document.
///
/// UTF-8 with non-ASCII characters left unescaped, 2-space indentation.
/// Calling twice with the same collection produces byte-identical output.
pub fn checkpoint_write<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json)?;
    Ok(())
}

/// Chunk-aligned checkpoint writer owning one output file for a run.
pub struct CheckpointWriter {
    path: PathBuf,
    chunk_size: usize,
    flushed_sizes: Vec<usize>,
}

impl CheckpointWriter {
    /// Create the output file (as an empty array) and the writer,
    /// making parent directories as needed.
    pub fn create(path: PathBuf, chunk_size: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&path, "[]")?;
        debug!(path = %path.display(), "Checkpoint file created");

        Ok(Self {
            path,
            chunk_size,
            flushed_sizes: Vec::new(),
        })
    }

    /// Flush when the collection size is a positive multiple of the chunk
    /// size; otherwise do nothing.
    pub fn maybe_flush<T: Serialize>(&mut self, records: &[T]) -> Result<()> {
        if !records.is_empty() && records.len() % self.chunk_size == 0 {
            self.flush(records)?;
        }
        Ok(())
    }

    /// Unconditional flush; the run's last write regardless of alignment.
    pub fn finalize<T: Serialize>(&mut self, records: &[T]) -> Result<()> {
        self.flush(records)
    }

    fn flush<T: Serialize>(&mut self, records: &[T]) -> Result<()> {
        checkpoint_write(&self.path, records)?;
        self.flushed_sizes.push(records.len());
        debug!(path = %self.path.display(), count = records.len(), "Checkpoint written");
        Ok(())
    }

    /// Output path this writer owns.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Collection sizes at each flush, in order (the empty creation write
    /// is not counted).
    pub fn flushed_sizes(&self) -> &[usize] {
        &self.flushed_sizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checkpoint_write_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let records = vec![json!({"title": "A"}), json!({"title": "B"})];

        checkpoint_write(&path, &records).unwrap();
        let first = fs::read(&path).unwrap();
        checkpoint_write(&path, &records).unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_checkpoint_format_keeps_non_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let records = vec![json!({"title": "高性能计算"})];

        checkpoint_write(&path, &records).unwrap();
        let content = fs::read_to_string(&path).unwrap();

        assert!(content.contains("高性能计算"));
        assert!(!content.contains("\\u"));
        // 2-space indentation, one object per array slot
        assert!(content.starts_with("[\n  {\n    \"title\""));
    }

    #[test]
    fn test_create_writes_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papers").join("out.json");

        let writer = CheckpointWriter::create(path.clone(), CHUNK_SIZE).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
        assert!(writer.flushed_sizes().is_empty());
    }

    #[test]
    fn test_flush_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let mut writer = CheckpointWriter::create(path, 3).unwrap();

        let mut records: Vec<serde_json::Value> = Vec::new();
        for i in 1..=7 {
            records.push(json!({"n": i}));
            writer.maybe_flush(&records).unwrap();
        }
        writer.finalize(&records).unwrap();

        // Multiples of the chunk size, then the forced final write
        assert_eq!(writer.flushed_sizes(), &[3, 6, 7]);
    }

    #[test]
    fn test_finalize_writes_even_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let mut writer = CheckpointWriter::create(path.clone(), CHUNK_SIZE).unwrap();

        let records: Vec<serde_json::Value> = Vec::new();
        writer.finalize(&records).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
        assert_eq!(writer.flushed_sizes(), &[0]);
    }
}
