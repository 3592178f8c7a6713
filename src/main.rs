//! # Nordjylland News Datasets
//!
//! A command-line pipeline that incrementally builds two offline datasets
//! from the paginated TV2 Nord articles API:
//!
//! - **summary**: plain-text article bodies paired with their editorial
//!   summaries, one record per article
//! - **image-caption**: image/caption pairs, one record per captioned image,
//!   optionally downloading the image binaries
//!
//! ## Usage
//!
//! ```sh
//! nordjylland_news summary --target 500
//! nordjylland_news image-caption --download-images
//! ```
//!
//! ## Architecture
//!
//! The pipeline is a single sequential loop per run:
//! 1. **Resume**: scan the dataset file, seed the dedup ledger, pick up at
//!    the page of the last persisted record
//! 2. **Fetch**: request one page of articles, with per-failure-class
//!    backoff owned by the engine
//! 3. **Extract**: map each article to zero or more records through the
//!    selected dataset strategy
//! 4. **Persist**: append the page's new records to the JSON-lines file,
//!    then move to the next page
//!
//! Interrupting the process at any point is safe: nothing is ever rewritten
//! in place, and the next run resumes from the persisted state.

use clap::Parser;
use std::error::Error;
use tracing::{debug, info};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod api;
mod cli;
mod config;
mod datasets;
mod engine;
mod extract;
mod ledger;
mod models;
mod store;

use api::ApiClient;
use cli::{Cli, DatasetArg};
use config::Config;
use datasets::{Dataset, ImageCaptionDataset, SummaryDataset};
use engine::{DatasetEngine, RunOutcome, TokioSleeper};
use store::JsonlStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("nordjylland_news starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.dataset, ?args.target, ?args.config, "Parsed CLI arguments");

    // --- Configuration ---
    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(token) = args.api_token {
        config.api.auth_token = token;
    }

    let client = ApiClient::new(&config.api)?;

    // --- Build the selected dataset ---
    let (outcome, unique) = match args.dataset {
        DatasetArg::Summary => {
            let store = JsonlStore::new(config.data.summary_path.clone());
            run_engine(client, store, SummaryDataset, &config, args.target).await?
        }
        DatasetArg::ImageCaption => {
            let dataset = if args.download_images {
                ImageCaptionDataset::with_downloads(config.data.image_dir.clone())
            } else {
                ImageCaptionDataset::new()
            };
            let store = JsonlStore::new(config.data.image_caption_path.clone());
            run_engine(client, store, dataset, &config, args.target).await?
        }
    };

    match outcome {
        RunOutcome::Exhausted => info!(unique, "No more articles; dataset is complete"),
        RunOutcome::TargetReached => info!(unique, "Target record count reached"),
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        "Execution complete"
    );

    Ok(())
}

/// Resume and drive one engine, returning the outcome and final record count.
async fn run_engine<D: Dataset>(
    client: ApiClient,
    store: JsonlStore<D::Record>,
    dataset: D,
    config: &Config,
    target: Option<u64>,
) -> Result<(RunOutcome, u64), engine::EngineError> {
    let mut engine =
        DatasetEngine::resume(client, store, dataset, config, target, TokioSleeper).await?;
    let outcome = engine.run().await?;
    Ok((outcome, engine.unique_records()))
}
