//! Blocklist downloads with conditional requests and retries.

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::StatusCode;
use std::time::Duration;

use crate::error::{Error, Result};

/// Retries after the first attempt.
const MAX_RETRIES: u32 = 3;
/// Base delay, doubled per retry.
const RETRY_BACKOFF_MS: u64 = 500;
/// Statuses worth retrying.
const RETRY_STATUS_CODES: &[u16] = &[429, 500, 502, 503, 504];
const USER_AGENT: &str = concat!("blocklist-optimizer/", env!("CARGO_PKG_VERSION"));

/// Validators from a previous download.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validators<'a> {
    pub etag: Option<&'a str>,
    pub last_modified: Option<&'a str>,
}

/// A fresh download.
#[derive(Debug, Clone)]
pub struct Download {
    pub content: Vec<u8>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// Result of a conditional fetch.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Server sent a new body
    Modified(Download),
    /// Server answered 304
    NotModified,
}

/// Blocking HTTP fetcher shared by download workers.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    max_retries: u32,
    backoff: Duration,
}

impl Fetcher {
    /// Create a fetcher with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
            backoff: Duration::from_millis(RETRY_BACKOFF_MS),
        })
    }

    /// Override the retry policy.
    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.backoff = backoff;
        self
    }

    /// Download `url`, sending conditional headers for known validators.
    ///
    /// Transport errors and retryable statuses are retried with exponential
    /// backoff. Other non-success statuses fail immediately.
    pub fn fetch(&self, url: &str, validators: Validators<'_>) -> Result<FetchOutcome> {
        let mut attempts = 0u32;

        loop {
            let mut request = self.client.get(url);
            if let Some(etag) = validators.etag {
                request = request.header(IF_NONE_MATCH, etag);
            }
            if let Some(lm) = validators.last_modified {
                request = request.header(IF_MODIFIED_SINCE, lm);
            }

            let response = match request.send() {
                Ok(response) => response,
                Err(e) if attempts < self.max_retries => {
                    attempts += 1;
                    self.wait(attempts, url, &e.to_string());
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();
            if status == StatusCode::NOT_MODIFIED {
                return Ok(FetchOutcome::NotModified);
            }

            if RETRY_STATUS_CODES.contains(&status.as_u16()) && attempts < self.max_retries {
                attempts += 1;
                self.wait(attempts, url, &format!("HTTP {}", status));
                continue;
            }

            if !status.is_success() {
                return Err(Error::HttpStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            return read_download(response).map(FetchOutcome::Modified);
        }
    }

    fn wait(&self, attempt: u32, url: &str, reason: &str) {
        let delay = backoff_delay(self.backoff, attempt);
        log::debug!(
            "Retry {}/{} for {} ({}), waiting {}ms",
            attempt,
            self.max_retries,
            url,
            reason,
            delay.as_millis()
        );
        std::thread::sleep(delay);
    }
}

fn read_download(response: Response) -> Result<Download> {
    let etag = header_string(response.headers(), ETAG);
    let last_modified = header_string(response.headers(), LAST_MODIFIED);
    let content = response.bytes()?.to_vec();

    Ok(Download {
        content,
        etag,
        last_modified,
    })
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}
