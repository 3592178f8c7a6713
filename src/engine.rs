//! The paginated, resumable fetch engine.
//!
//! One generic engine walks the articles API page by page, feeds every
//! article through a dataset strategy, and appends whatever comes out to the
//! dataset store. The same engine builds both datasets; everything
//! dataset-specific lives behind the [`Dataset`](crate::datasets::Dataset)
//! trait.
//!
//! # Resumability
//!
//! The engine holds no durable state of its own. At construction it scans
//! the store once: the dedup ledger is seeded from every record's key and
//! the start page is the `page` field of the last record (1 for an empty
//! store). Because the page counter only advances after a successful append,
//! a crash loses at most one page of unpersisted work, and that page is
//! safely redone on restart with the ledger filtering out records it
//! already produced.
//!
//! # Retry policy
//!
//! The HTTP client never retries; this layer owns all backoff:
//!
//! | failure | backoff | bound |
//! |---------|---------|-------|
//! | `RateLimited`, `ServerUnavailable`, `ServerError` | long sleep | none |
//! | `Transport` | medium sleep | none |
//! | `UnexpectedStatus`, `Decode`, `InvalidUrl` | medium sleep | `max_anomalous_attempts`, then the page is reported unresolved |
//!
//! An unresolved page halts the run with [`EngineError::PageFailed`] rather
//! than skipping ahead: a silently missing page would corrupt the resume
//! invariant.
//!
//! All waiting goes through the [`Sleeper`] trait so tests can assert on
//! backoff selection with a recording sleeper instead of real sleeps.

use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::api::{ApiClient, FetchError};
use crate::config::{Config, RetryConfig, SleepConfig};
use crate::datasets::Dataset;
use crate::ledger::Ledger;
use crate::models::ArticlePage;
use crate::store::{JsonlStore, StoreError};

/// Something that can wait. Production wires in [`TokioSleeper`]; tests
/// record the requested durations instead of sleeping.
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

/// Real waiting via `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Backoff durations and bounds, derived from configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    medium: Duration,
    long: Duration,
    max_anomalous_attempts: u32,
}

/// How to respond to one classified failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backoff {
    /// The server is asking for patience; wait and retry indefinitely.
    Patience(Duration),
    /// Anomalous response; wait and retry, but only within the bound.
    Anomalous(Duration),
}

impl RetryPolicy {
    pub fn from_config(sleeps: &SleepConfig, retry: &RetryConfig) -> Self {
        Self {
            medium: sleeps.medium(),
            long: sleeps.long(),
            max_anomalous_attempts: retry.max_anomalous_attempts.max(1),
        }
    }

    fn backoff(&self, error: &FetchError) -> Backoff {
        match error {
            FetchError::RateLimited { .. }
            | FetchError::ServerUnavailable { .. }
            | FetchError::ServerError { .. } => Backoff::Patience(self.long),
            FetchError::Transport { .. } => Backoff::Patience(self.medium),
            FetchError::UnexpectedStatus { .. }
            | FetchError::Decode { .. }
            | FetchError::InvalidUrl { .. } => Backoff::Anomalous(self.medium),
        }
    }
}

/// The bounded retry budget ran out on anomalous failures.
#[derive(Debug, Error)]
#[error("gave up after {attempts} attempts")]
pub struct RetryExhausted {
    /// Total fetch attempts made, counting every failure class.
    pub attempts: u32,
    /// The failure observed on the final attempt.
    #[source]
    pub last: FetchError,
}

/// Retry `op` according to `policy`, sleeping through `sleeper`.
///
/// Patience-class failures retry forever; anomalous failures count toward
/// the bound and exhaust into [`RetryExhausted`].
async fn retry<T, F, Fut, S>(
    policy: &RetryPolicy,
    sleeper: &S,
    what: &'static str,
    mut op: F,
) -> Result<T, RetryExhausted>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
    S: Sleeper,
{
    let mut attempts: u32 = 0;
    let mut anomalous: u32 = 0;
    loop {
        attempts += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(last) => {
                let delay = match policy.backoff(&last) {
                    Backoff::Patience(delay) => delay,
                    Backoff::Anomalous(delay) => {
                        anomalous += 1;
                        if anomalous >= policy.max_anomalous_attempts {
                            error!(what, attempts, error = %last, "Retries exhausted");
                            return Err(RetryExhausted { attempts, last });
                        }
                        delay
                    }
                };
                warn!(
                    what,
                    attempt = attempts,
                    delay_secs = delay.as_secs(),
                    error = %last,
                    "Fetch failed; backing off"
                );
                sleeper.sleep(delay).await;
            }
        }
    }
}

/// A borrowed bundle of client + policy + sleeper handed to dataset hooks,
/// so image downloads go through the same retry discipline as page fetches.
#[derive(Debug)]
pub struct RetryingFetcher<'a, S: Sleeper> {
    client: &'a ApiClient,
    policy: &'a RetryPolicy,
    sleeper: &'a S,
}

impl<'a, S: Sleeper> RetryingFetcher<'a, S> {
    async fn page(&self, page: u64) -> Result<ArticlePage, RetryExhausted> {
        let client = self.client;
        retry(self.policy, self.sleeper, "article page", move || {
            client.fetch_page(page)
        })
        .await
    }

    /// Download raw bytes with the shared retry policy.
    pub async fn bytes(&self, url: &str) -> Result<Vec<u8>, RetryExhausted> {
        let client = self.client;
        retry(self.policy, self.sleeper, "binary download", move || {
            client.fetch_bytes(url)
        })
        .await
    }
}

/// Terminal failure of a run. Distinct from normal termination: the caller
/// can always tell an unresolved page from "no more articles".
#[derive(Debug, Error)]
pub enum EngineError {
    /// The bounded retry budget ran out; the page is unresolved and
    /// processing halted rather than skipping data.
    #[error("page {page} left unresolved")]
    PageFailed {
        page: u64,
        #[source]
        source: RetryExhausted,
    },

    /// An image referenced by a fresh record could not be downloaded.
    #[error("image download failed for {url}")]
    Download {
        url: String,
        #[source]
        source: RetryExhausted,
    },

    /// A downloaded image could not be written to disk.
    #[error("failed writing image file {path}")]
    ImageWrite {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The API returned an empty page: every article has been consumed.
    Exhausted,
    /// The configured target record count was reached.
    TargetReached,
}

/// Walks API pages and feeds a dataset strategy.
///
/// Owns the dedup ledger and the current page counter exclusively; the sole
/// state-advancing side effect is the store append, and the page counter
/// only moves after it succeeds.
pub struct DatasetEngine<D: Dataset, S: Sleeper> {
    client: ApiClient,
    store: JsonlStore<D::Record>,
    dataset: D,
    policy: RetryPolicy,
    page_delay: Duration,
    sleeper: S,
    ledger: Ledger,
    page: u64,
    target: Option<u64>,
}

impl<D: Dataset, S: Sleeper> DatasetEngine<D, S> {
    /// Reconstruct resume state from the store and build an engine.
    ///
    /// Initializes the store file if absent, seeds the ledger from every
    /// persisted record's dedup key, and picks up at the page of the last
    /// record (1 for an empty store).
    pub async fn resume(
        client: ApiClient,
        store: JsonlStore<D::Record>,
        mut dataset: D,
        config: &Config,
        target: Option<u64>,
        sleeper: S,
    ) -> Result<Self, EngineError> {
        store.initialize().await?;
        let existing = store.read_all().await?;

        let page = existing.last().map(D::page_of).unwrap_or(1);
        let ledger = Ledger::seeded(existing.iter().map(|r| D::dedup_key(r).to_string()));
        dataset.on_resume(&ledger);

        info!(
            dataset = dataset.name(),
            resume_page = page,
            existing = ledger.len(),
            "Resume state reconstructed"
        );

        Ok(Self {
            client,
            store,
            dataset,
            policy: RetryPolicy::from_config(&config.sleeps, &config.retry),
            page_delay: config.sleeps.short(),
            sleeper,
            ledger,
            page,
            target,
        })
    }

    /// Page the next fetch would request.
    pub fn current_page(&self) -> u64 {
        self.page
    }

    /// Unique records across the whole dataset, persisted plus this run.
    pub fn unique_records(&self) -> u64 {
        self.ledger.len()
    }

    /// Run until the API is exhausted, the target is reached, or a page
    /// fails.
    pub async fn run(&mut self) -> Result<RunOutcome, EngineError> {
        info!(dataset = self.dataset.name(), "Building dataset");

        if let Some(target) = self.target {
            if self.ledger.len() >= target {
                info!(unique = self.ledger.len(), target, "Target already reached");
                return Ok(RunOutcome::TargetReached);
            }
        }

        // Progress denominator only; a failed probe never gates the run.
        let total_articles = match self.client.total_articles().await {
            Ok(total) => Some(total),
            Err(error) => {
                warn!(error = %error, "Could not probe total article count");
                None
            }
        };

        loop {
            let fetch = RetryingFetcher {
                client: &self.client,
                policy: &self.policy,
                sleeper: &self.sleeper,
            };

            let article_page =
                fetch
                    .page(self.page)
                    .await
                    .map_err(|source| EngineError::PageFailed {
                        page: self.page,
                        source,
                    })?;

            if article_page.data.is_empty() {
                info!(
                    dataset = self.dataset.name(),
                    page = self.page,
                    unique = self.ledger.len(),
                    "No more articles; dataset done"
                );
                return Ok(RunOutcome::Exhausted);
            }

            let mut batch: Vec<D::Record> = Vec::new();
            let mut target_reached = false;
            for article in &article_page.data {
                batch.extend(self.dataset.extract(article, self.page, &mut self.ledger));
                if let Some(target) = self.target {
                    if self.ledger.len() >= target {
                        // Remaining articles on this page are left for the
                        // next run; dedup skips the head we just persisted.
                        target_reached = true;
                        break;
                    }
                }
            }

            self.dataset.after_extract(&fetch, &batch).await?;
            self.store.append(&batch).await?;

            info!(
                dataset = self.dataset.name(),
                page = self.page,
                new = batch.len(),
                unique = self.ledger.len(),
                total = ?total_articles,
                "Page persisted"
            );

            if target_reached {
                info!(unique = self.ledger.len(), "Target record count reached");
                return Ok(RunOutcome::TargetReached);
            }

            self.page += 1;
            self.sleeper.sleep(self.page_delay).await;
        }
    }
}
