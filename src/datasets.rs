//! Dataset strategies: what to extract from an article and how to dedup it.
//!
//! The engine is generic over a [`Dataset`], which bundles the record type,
//! its dedup key, and the extraction rule. Selecting a dataset means
//! passing a different strategy value, nothing more.
//!
//! - [`SummaryDataset`]: one record per unseen *article* UUID, pairing the
//!   stripped body text with the editorial summary.
//! - [`ImageCaptionDataset`]: one record per unseen *image* UUID with a
//!   caption, optionally downloading the image binary alongside.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::engine::{EngineError, RetryingFetcher, Sleeper};
use crate::extract;
use crate::ledger::Ledger;
use crate::models::{Article, ImageCaptionRecord, SummaryRecord};

/// Extraction capability the engine is parameterized by.
pub trait Dataset {
    /// The persisted row type.
    type Record: Serialize + DeserializeOwned + Clone;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Page a persisted record was extracted on (resume point source).
    fn page_of(record: &Self::Record) -> u64;

    /// Dedup key of a persisted record (ledger seed source).
    fn dedup_key(record: &Self::Record) -> &str;

    /// Called once after the ledger has been seeded from the store.
    fn on_resume(&mut self, _ledger: &Ledger) {}

    /// Map one article into zero or more new records, marking their keys in
    /// the ledger.
    fn extract(
        &mut self,
        article: &Article,
        page: u64,
        ledger: &mut Ledger,
    ) -> Vec<Self::Record>;

    /// Side effects for freshly extracted records, run before the batch is
    /// persisted. The default does nothing.
    async fn after_extract<S: Sleeper>(
        &mut self,
        _fetch: &RetryingFetcher<'_, S>,
        _records: &[Self::Record],
    ) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Article text paired with its editorial summary, deduped by article UUID.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryDataset;

impl Dataset for SummaryDataset {
    type Record = SummaryRecord;

    fn name(&self) -> &'static str {
        "summary"
    }

    fn page_of(record: &Self::Record) -> u64 {
        record.page
    }

    fn dedup_key(record: &Self::Record) -> &str {
        &record.uuid
    }

    fn extract(
        &mut self,
        article: &Article,
        page: u64,
        ledger: &mut Ledger,
    ) -> Vec<Self::Record> {
        if ledger.contains(&article.uuid) {
            return Vec::new();
        }
        ledger.add(&article.uuid);
        vec![extract::summary_record(article, page)]
    }
}

/// Captioned images, deduped by image UUID.
///
/// With downloads enabled every fresh record's binary is fetched through
/// the engine's retry policy and written to `<dir>/<n>.jpg`, where `n`
/// continues from the number of records already in the dataset.
#[derive(Debug, Clone, Default)]
pub struct ImageCaptionDataset {
    downloads: Option<ImageDownloads>,
}

#[derive(Debug, Clone)]
struct ImageDownloads {
    dir: PathBuf,
    next_file: u64,
}

impl ImageCaptionDataset {
    /// Metadata-only mode: records are persisted, binaries are not fetched.
    pub fn new() -> Self {
        Self::default()
    }

    /// Download each fresh record's image into `dir`.
    pub fn with_downloads(dir: PathBuf) -> Self {
        Self {
            downloads: Some(ImageDownloads { dir, next_file: 1 }),
        }
    }
}

impl Dataset for ImageCaptionDataset {
    type Record = ImageCaptionRecord;

    fn name(&self) -> &'static str {
        "image-caption"
    }

    fn page_of(record: &Self::Record) -> u64 {
        record.page
    }

    fn dedup_key(record: &Self::Record) -> &str {
        &record.uuid
    }

    fn on_resume(&mut self, ledger: &Ledger) {
        if let Some(downloads) = &mut self.downloads {
            // File numbering continues after the images of previous runs.
            downloads.next_file = ledger.len() + 1;
        }
    }

    fn extract(
        &mut self,
        article: &Article,
        page: u64,
        ledger: &mut Ledger,
    ) -> Vec<Self::Record> {
        extract::image_records(article, page, ledger)
    }

    async fn after_extract<S: Sleeper>(
        &mut self,
        fetch: &RetryingFetcher<'_, S>,
        records: &[Self::Record],
    ) -> Result<(), EngineError> {
        let Some(downloads) = &mut self.downloads else {
            return Ok(());
        };
        if records.is_empty() {
            return Ok(());
        }

        tokio::fs::create_dir_all(&downloads.dir)
            .await
            .map_err(|source| EngineError::ImageWrite {
                path: downloads.dir.clone(),
                source,
            })?;

        for record in records {
            let bytes =
                fetch
                    .bytes(&record.download_url)
                    .await
                    .map_err(|source| EngineError::Download {
                        url: record.download_url.clone(),
                        source,
                    })?;

            let path = downloads.dir.join(format!("{}.jpg", downloads.next_file));
            tokio::fs::write(&path, &bytes)
                .await
                .map_err(|source| EngineError::ImageWrite {
                    path: path.clone(),
                    source,
                })?;
            debug!(path = %path.display(), bytes = bytes.len(), "Saved image");
            downloads.next_file += 1;
        }
        Ok(())
    }
}
