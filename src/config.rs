//! Runtime configuration for the dataset builders.
//!
//! Configuration is loaded from an optional YAML file; every field has a
//! default matching the public TV2 Nord API, so an empty (or absent) file is
//! a valid configuration. The core pipeline receives this struct as plain
//! values and never touches the filesystem for configuration itself.
//!
//! ```yaml
//! api:
//!   base_url: "https://nordjylland.bazo.dk/api/v1/articles"
//!   page_size: 100
//! sleeps:
//!   long_secs: 60
//! data:
//!   summary_path: "data/raw/summary.jsonl"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Failure loading or parsing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed reading config file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed parsing config file {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub api: ApiConfig,
    pub sleeps: SleepConfig,
    pub retry: RetryConfig,
    pub data: DataConfig,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        info!(path, "Loaded configuration");
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Articles API endpoint and transport settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Absolute URL of the articles collection.
    pub base_url: String,
    /// Articles requested per page. The API caps this at 100.
    pub page_size: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Value sent in the `Authorization` header.
    pub auth_token: String,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nordjylland.bazo.dk/api/v1/articles".to_string(),
            page_size: 100,
            timeout_secs: 30,
            auth_token: "centered".to_string(),
        }
    }
}

/// Sleep tiers used by the retry policy and page pacing.
///
/// `long` backs off rate-limit and server failures, `medium` backs off
/// transport and anomalous failures, `short` is the fixed delay between
/// successfully processed pages.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SleepConfig {
    pub short_secs: u64,
    pub medium_secs: u64,
    pub long_secs: u64,
}

impl SleepConfig {
    pub fn short(&self) -> Duration {
        Duration::from_secs(self.short_secs)
    }

    pub fn medium(&self) -> Duration {
        Duration::from_secs(self.medium_secs)
    }

    pub fn long(&self) -> Duration {
        Duration::from_secs(self.long_secs)
    }
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            short_secs: 5,
            medium_secs: 30,
            long_secs: 60,
        }
    }
}

/// Bounds on the retry loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// How many anomalous failures (unexpected status, malformed body) are
    /// tolerated per request before the page is reported unresolved.
    pub max_anomalous_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_anomalous_attempts: 100,
        }
    }
}

/// Where the datasets live on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    /// JSON-lines file for the summarisation dataset.
    pub summary_path: PathBuf,
    /// JSON-lines file for the image-caption dataset.
    pub image_caption_path: PathBuf,
    /// Directory downloaded image files are written into.
    pub image_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            summary_path: PathBuf::from("data/raw/summary.jsonl"),
            image_caption_path: PathBuf::from("data/raw/image_captions.jsonl"),
            image_dir: PathBuf::from("data/images"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_api_contract() {
        let config = Config::default();
        assert_eq!(config.api.page_size, 100);
        assert_eq!(config.api.auth_token, "centered");
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
        assert_eq!(config.sleeps.short(), Duration::from_secs(5));
        assert_eq!(config.sleeps.medium(), Duration::from_secs(30));
        assert_eq!(config.sleeps.long(), Duration::from_secs(60));
        assert_eq!(config.retry.max_anomalous_attempts, 100);
    }

    #[test]
    fn test_partial_yaml_overrides_only_named_fields() {
        let yaml = r#"
api:
  page_size: 10
sleeps:
  long_secs: 120
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.api.page_size, 10);
        assert_eq!(config.sleeps.long_secs, 120);
        // Everything else keeps its default.
        assert_eq!(config.api.auth_token, "centered");
        assert_eq!(config.sleeps.short_secs, 5);
        assert_eq!(
            config.data.summary_path,
            PathBuf::from("data/raw/summary.jsonl")
        );
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let yaml = "api:\n  page_sise: 10\n";
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_load_or_default_without_path() {
        let config = Config::load_or_default(None).unwrap();
        assert_eq!(config.api.page_size, 100);
    }
}
