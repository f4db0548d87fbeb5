use std::thread;
use std::time::{Duration, Instant};

use encoding_rs::Encoding;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderName, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED};
use thiserror::Error;
use tracing::debug;

use crate::core::{parse_content_type, ScraperOptions};

/// Stability identifier used when the server gives no hint at all.
pub const UNKNOWN_IDENT: &str = "-1";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    /// Failures worth retrying: network trouble, throttling, server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Request { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request() || source.is_body()
            }
            FetchError::Decode { .. } | FetchError::Client(_) => false,
        }
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, FetchError::Status { status: 403, .. })
    }
}

/// Exponential backoff bounded by a total wall-clock budget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_elapsed: Duration,
    pub initial_delay: Duration,
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_elapsed: Duration::from_secs(16),
            initial_delay: Duration::from_millis(500),
            factor: 2,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retry.
    pub fn none() -> RetryPolicy {
        RetryPolicy {
            max_elapsed: Duration::ZERO,
            initial_delay: Duration::ZERO,
            factor: 1,
        }
    }

    pub fn run<T>(
        &self,
        what: &str,
        mut operation: impl FnMut() -> Result<T, FetchError>,
    ) -> Result<T, FetchError> {
        let started = Instant::now();
        let mut delay = self.initial_delay;
        let mut attempt = 1;

        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(err)
                    if err.is_transient() && started.elapsed() + delay <= self.max_elapsed =>
                {
                    debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying {}: {}", what, err);
                    thread::sleep(delay);
                    delay *= self.factor;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// What a header-only probe learns about a resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderData {
    /// Media type, lowercased, without parameters
    pub content_type: Option<String>,
    /// ETag, else Last-Modified, else Content-Length, else [`UNKNOWN_IDENT`]
    pub ident: String,
}

impl HeaderData {
    pub fn from_headers(headers: &HeaderMap) -> HeaderData {
        let header = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        let ident = header(ETAG)
            .or_else(|| header(LAST_MODIFIED))
            .or_else(|| header(CONTENT_LENGTH))
            .unwrap_or_else(|| UNKNOWN_IDENT.to_string());
        let content_type = header(CONTENT_TYPE)
            .map(|value| parse_content_type(&value).0)
            .filter(|value| !value.is_empty());

        HeaderData {
            content_type,
            ident,
        }
    }
}

/// Blocking HTTP session shared by the API client and the asset workers.
pub struct Session {
    client: Client,
    long_client: Client,
    retry: RetryPolicy,
}

impl Session {
    pub fn new(options: &ScraperOptions) -> Result<Session, FetchError> {
        let build = |timeout: Duration| {
            Client::builder()
                .timeout(timeout)
                .user_agent(options.user_agent())
                .build()
                .map_err(FetchError::Client)
        };

        Ok(Session {
            client: build(options.http_timeout)?,
            long_client: build(options.http_timeout_long)?,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Session {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn send(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        long: bool,
    ) -> Result<Response, FetchError> {
        let client = if long { &self.long_client } else { &self.client };
        let mut request = client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response)
    }

    /// Full body of a resource, with the default retry policy.
    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.get_bytes_with(url, &[], &self.retry)
    }

    pub fn get_bytes_with(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        retry: &RetryPolicy,
    ) -> Result<Vec<u8>, FetchError> {
        retry.run(url, || {
            let response = self.send(url, headers, true)?;
            response
                .bytes()
                .map(|bytes| bytes.to_vec())
                .map_err(|source| FetchError::Request {
                    url: url.to_string(),
                    source,
                })
        })
    }

    /// Body decoded according to the charset announced by the server.
    pub fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.retry.run(url, || {
            let response = self.send(url, &[], false)?;
            let charset = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(|value| parse_content_type(value).1)
                .unwrap_or_default();
            let data = response.bytes().map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

            Ok(decode_text(&data, &charset))
        })
    }

    pub fn get_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<serde_json::Value, FetchError> {
        let data = self.get_bytes_with(url, headers, &self.retry)?;
        serde_json::from_slice(&data).map_err(|err| FetchError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        })
    }

    /// Reads only the response headers of a GET, never the body.
    pub fn probe(&self, url: &str, retry: &RetryPolicy) -> Result<HeaderData, FetchError> {
        retry.run(url, || {
            let response = self.send(url, &[], false)?;
            Ok(HeaderData::from_headers(response.headers()))
        })
    }
}

pub fn decode_text(data: &[u8], charset: &str) -> String {
    match Encoding::for_label(charset.as_bytes()) {
        Some(encoding) if !charset.is_empty() => encoding.decode(data).0.to_string(),
        _ => String::from_utf8_lossy(data).to_string(),
    }
}
