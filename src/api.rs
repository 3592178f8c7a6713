//! TV2 Nord articles API client.
//!
//! This module owns all HTTP transport: a [`ApiClient`] wrapping a single
//! `reqwest::Client` configured once with the API headers and request
//! timeout, and the [`FetchError`] taxonomy the rest of the pipeline keys
//! its retry policy on.
//!
//! # No retries here
//!
//! The client deliberately never retries and never sleeps. Every failure is
//! classified and returned immediately; the pagination engine one layer up
//! owns the backoff policy. That split keeps the policy observable and
//! testable independent of transport behavior.
//!
//! # Status classification
//!
//! | HTTP status | error |
//! |-------------|-------|
//! | 200         | success |
//! | 429         | [`FetchError::RateLimited`] |
//! | 503         | [`FetchError::ServerUnavailable`] |
//! | 500         | [`FetchError::ServerError`] |
//! | anything else | [`FetchError::UnexpectedStatus`] |
//!
//! Network-level failures (connect, timeout, DNS) map to
//! [`FetchError::Transport`]; a 200 whose body does not decode maps to
//! [`FetchError::Decode`].

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::models::ArticlePage;

/// A failed fetch, classified for the retry policy.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP 429: the API is asking for patience.
    #[error("rate limited (HTTP 429) at {url}")]
    RateLimited { url: String },

    /// HTTP 503: the API is temporarily down.
    #[error("service unavailable (HTTP 503) at {url}")]
    ServerUnavailable { url: String },

    /// HTTP 500: the API hit an internal error.
    #[error("internal server error (HTTP 500) at {url}")]
    ServerError { url: String },

    /// Any other non-200 status. Anomalous rather than transient.
    #[error("unexpected status {status} at {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Network-level failure: connection reset, timeout, DNS.
    #[error("transport failure at {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// HTTP 200 whose body did not decode as the expected shape.
    #[error("malformed response body at {url}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A URL taken from API data that does not parse.
    #[error("invalid url {url:?}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Failure constructing the client itself (bad config, TLS init).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid API base url {url:?}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("API token is not a valid header value")]
    AuthHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),
}

/// HTTP client for the paginated articles API.
///
/// Cheap to share by reference; the inner `reqwest::Client` pools
/// connections across requests.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    page_size: u32,
}

impl ApiClient {
    /// Build a client from API configuration.
    ///
    /// The `Accept` and `Authorization` headers and the request timeout are
    /// fixed here for the lifetime of the client.
    pub fn new(cfg: &ApiConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&cfg.base_url).map_err(|source| ClientError::BaseUrl {
            url: cfg.base_url.clone(),
            source,
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&cfg.auth_token)?);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(cfg.timeout())
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            http,
            base_url,
            page_size: cfg.page_size,
        })
    }

    /// Fetch one page of articles.
    ///
    /// Issues `GET <base>?page[number]=<page>&page[size]=<page_size>` and
    /// decodes the `{data, meta}` envelope.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_page(&self, page: u64) -> Result<ArticlePage, FetchError> {
        let url = self.page_url(page, self.page_size);
        let response = self.get(url.clone()).await?;
        let page = decode_json(url, response).await?;
        debug!(articles = page.data.len(), "Fetched article page");
        Ok(page)
    }

    /// Probe the total number of articles the API currently holds.
    ///
    /// A `page[size]=1` request keeps the probe cheap. The result is used
    /// only for progress reporting, never for correctness.
    #[instrument(level = "debug", skip(self))]
    pub async fn total_articles(&self) -> Result<u64, FetchError> {
        let url = self.page_url(1, 1);
        let response = self.get(url.clone()).await?;
        let page: ArticlePage = decode_json(url, response).await?;
        Ok(page.meta.total)
    }

    /// Download raw bytes, e.g. an image asset referenced by a record.
    ///
    /// Failure classification is identical to the page fetches.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let response = self.get(parsed.clone()).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport {
                url: parsed.to_string(),
                source,
            })?;
        Ok(bytes.to_vec())
    }

    fn page_url(&self, page: u64, size: u32) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("page[number]", &page.to_string())
            .append_pair("page[size]", &size.to_string());
        url
    }

    /// Issue a GET and classify the response status.
    async fn get(&self, url: Url) -> Result<reqwest::Response, FetchError> {
        let response =
            self.http
                .get(url.clone())
                .send()
                .await
                .map_err(|source| FetchError::Transport {
                    url: url.to_string(),
                    source,
                })?;

        match response.status() {
            StatusCode::OK => Ok(response),
            StatusCode::TOO_MANY_REQUESTS => Err(FetchError::RateLimited {
                url: url.to_string(),
            }),
            StatusCode::SERVICE_UNAVAILABLE => Err(FetchError::ServerUnavailable {
                url: url.to_string(),
            }),
            StatusCode::INTERNAL_SERVER_ERROR => Err(FetchError::ServerError {
                url: url.to_string(),
            }),
            status => {
                warn!(status = status.as_u16(), %url, "Unexpected response status");
                Err(FetchError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                })
            }
        }
    }
}

async fn decode_json(url: Url, response: reqwest::Response) -> Result<ArticlePage, FetchError> {
    response.json::<ArticlePage>().await.map_err(|source| {
        if source.is_decode() {
            FetchError::Decode {
                url: url.to_string(),
                source,
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source,
            }
        }
    })
}
