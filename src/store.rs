//! Append-only JSON-lines persistence for dataset records.
//!
//! One dataset lives in one physical file: one JSON object per line, UTF-8,
//! no enclosing array. New records are only ever appended; nothing is
//! rewritten in place. At startup the file is scanned once to rebuild the
//! dedup ledger and the resume page.
//!
//! # Crash behavior
//!
//! A batch is serialized into a single buffer and written with one
//! `write_all` on an append-mode handle, so readers see it all-or-nothing.
//! A crash mid-write can at worst truncate the final line; [`JsonlStore::read_all`]
//! treats a malformed *trailing* line as that artifact and drops it, while a
//! malformed interior line is real corruption and fails the scan.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Failure reading or writing a dataset file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io failure on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt record on line {line} of {path}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed serializing record")]
    Encode(#[source] serde_json::Error),
}

/// Append-only JSON-lines file holding records of type `R`.
#[derive(Debug, Clone)]
pub struct JsonlStore<R> {
    path: PathBuf,
    _record: PhantomData<fn() -> R>,
}

impl<R> JsonlStore<R>
where
    R: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty store file if none exists.
    ///
    /// Idempotent: an existing file is left untouched, never truncated.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|source| self.io_err(source))?;
            }
        }
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|source| self.io_err(source))?;
        Ok(())
    }

    /// Scan the whole file and deserialize every record.
    ///
    /// Used only at startup for ledger and resume-point reconstruction. A
    /// missing file reads as empty.
    pub async fn read_all(&self) -> Result<Vec<R>, StoreError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_err(source)),
        };

        let lines: Vec<(usize, &str)> = raw
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .collect();

        let mut records = Vec::with_capacity(lines.len());
        for (index, (line_no, line)) in lines.iter().enumerate() {
            match serde_json::from_str::<R>(line) {
                Ok(record) => records.push(record),
                Err(source) if index == lines.len() - 1 => {
                    // Truncated trailing line from an interrupted append.
                    warn!(
                        path = %self.path.display(),
                        line = line_no + 1,
                        error = %source,
                        "Dropping malformed trailing line"
                    );
                }
                Err(source) => {
                    return Err(StoreError::Corrupt {
                        path: self.path.clone(),
                        line: line_no + 1,
                        source,
                    });
                }
            }
        }

        info!(path = %self.path.display(), records = records.len(), "Loaded dataset");
        Ok(records)
    }

    /// Append a batch of records to the end of the file.
    ///
    /// The whole batch is serialized first and written with a single
    /// `write_all`, so a reader never observes part of a batch.
    pub async fn append(&self, records: &[R]) -> Result<(), StoreError> {
        if records.is_empty() {
            debug!(path = %self.path.display(), "Nothing new to append");
            return Ok(());
        }

        let mut buffer = String::new();
        for record in records {
            buffer.push_str(&serde_json::to_string(record).map_err(StoreError::Encode)?);
            buffer.push('\n');
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|source| self.io_err(source))?;
        file.write_all(buffer.as_bytes())
            .await
            .map_err(|source| self.io_err(source))?;
        file.flush()
            .await
            .map_err(|source| self.io_err(source))?;

        debug!(path = %self.path.display(), appended = records.len(), "Appended records");
        Ok(())
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
