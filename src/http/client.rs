//! HTTP client with retry and backoff
//!
//! Every request carries the configured user agent. Transient failures
//! (HTTP 429, HTTP 503 and transport errors) are retried with exponential
//! backoff until the attempt ceiling is reached; the last failure is then
//! surfaced to the caller. Any other non-success status fails immediately.

use crate::config::HttpConfig;
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the HTTP client after retries are exhausted
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("read timed out for {url}")]
    Timeout { url: String },

    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

impl HttpError {
    /// Returns true for failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16()
                    || *status == StatusCode::SERVICE_UNAVAILABLE.as_u16()
            }
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Build(_) => false,
        }
    }
}

/// Source of body chunks for streaming consumers
///
/// Implemented by [`ResponseBody`] for live responses; tests provide in-memory
/// sources.
#[allow(async_fn_in_trait)]
pub trait ChunkSource {
    /// Returns the next chunk, or `None` once the body is exhausted
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, HttpError>;
}

/// A streamed response body with a per-read timeout
pub struct ResponseBody {
    url: String,
    response: Response,
    read_timeout: Duration,
}

impl ChunkSource for ResponseBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, HttpError> {
        match tokio::time::timeout(self.read_timeout, self.response.chunk()).await {
            Ok(Ok(chunk)) => Ok(chunk),
            Ok(Err(source)) => Err(HttpError::Transport {
                url: self.url.clone(),
                source,
            }),
            Err(_) => Err(HttpError::Timeout {
                url: self.url.clone(),
            }),
        }
    }
}

/// Shared HTTP client for catalog, manifest and archive requests
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    read_timeout: Duration,
}

impl HttpClient {
    /// Builds a client from the HTTP configuration
    ///
    /// There is no whole-request timeout because archive bodies can take many
    /// minutes to stream; instead the connect phase and every body read are
    /// bounded by `timeout-secs`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use warc_sweep::config::HttpConfig;
    /// use warc_sweep::http::HttpClient;
    ///
    /// let client = HttpClient::new(&HttpConfig::default()).unwrap();
    /// ```
    pub fn new(config: &HttpConfig) -> Result<Self, HttpError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(timeout)
            .build()
            .map_err(HttpError::Build)?;

        Ok(Self {
            client,
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            read_timeout: timeout,
        })
    }

    /// Sends a GET request, retrying transient failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 2xx | Return the response |
    /// | HTTP 429 / 503 | Retry with backoff |
    /// | Transport error | Retry with backoff |
    /// | Other status | Fail immediately |
    ///
    /// Backoff starts at `initial-backoff-ms`, doubles after each failure and
    /// is capped at `max-backoff-ms`.
    pub async fn get(&self, url: &str) -> Result<Response, HttpError> {
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;

        loop {
            let err = match self.client.get(url).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => HttpError::Status {
                    url: url.to_string(),
                    status: response.status().as_u16(),
                },
                Err(source) => HttpError::Transport {
                    url: url.to_string(),
                    source,
                },
            };

            if !err.is_retryable() || attempt >= self.max_attempts {
                return Err(err);
            }

            tracing::debug!(
                "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                attempt,
                self.max_attempts,
                url,
                err,
                backoff
            );
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(self.max_backoff);
            attempt += 1;
        }
    }

    /// Fetches a whole body into memory
    ///
    /// Only meant for small documents such as the catalog and manifests.
    pub async fn get_bytes(&self, url: &str) -> Result<Bytes, HttpError> {
        let response = self.get(url).await?;
        let mut body = self.stream(url, response);
        let mut buf = Vec::new();
        while let Some(chunk) = body.next_chunk().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(buf))
    }

    /// Sends a GET request and returns its body as a chunk stream
    pub async fn get_stream(&self, url: &str) -> Result<ResponseBody, HttpError> {
        let response = self.get(url).await?;
        Ok(self.stream(url, response))
    }

    fn stream(&self, url: &str, response: Response) -> ResponseBody {
        ResponseBody {
            url: url.to_string(),
            response,
            read_timeout: self.read_timeout,
        }
    }
}
