//! Command-line interface definitions.
//!
//! This module defines the CLI arguments and options using the `clap`
//! crate. The API token can also be provided via environment variable.

use clap::{Parser, ValueEnum};

/// Command-line arguments for the dataset builders.
///
/// # Examples
///
/// ```sh
/// # Grow the summarisation dataset until 500 unique articles are stored
/// nordjylland_news summary --target 500
///
/// # Build the image-caption dataset, saving the image binaries too
/// nordjylland_news image-caption --download-images
///
/// # Custom configuration
/// nordjylland_news summary -c config.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Which dataset to build
    #[arg(value_enum)]
    pub dataset: DatasetArg,

    /// Optional path to a config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Stop once this many unique records have been collected
    #[arg(short, long)]
    pub target: Option<u64>,

    /// Download the image binaries referenced by image-caption records
    #[arg(long)]
    pub download_images: bool,

    /// Value for the API Authorization header
    #[arg(long, env = "TV2_NORD_API_TOKEN")]
    pub api_token: Option<String>,
}

/// The two datasets this tool can build.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetArg {
    /// Article text paired with its editorial summary
    Summary,
    /// Captioned images
    ImageCaption,
}
