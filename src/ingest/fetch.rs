//! Resilient fetching of SWPC feeds.
//!
//! One retry policy for every endpoint: up to `max_retries` attempts with a
//! fixed backoff between them. Transport failures and bodies that do not
//! decode as the feed's payload kind both count as failed attempts. After
//! the last attempt the outcome is `FetchOutcome::Unavailable`; nothing is
//! raised past this boundary. A successful empty body (`[]`) is a payload,
//! not a failure.

use std::time::Duration;

use serde_json::Value;

use crate::config::FeedConfig;
use crate::feeds::PayloadKind;
use crate::logging::{self, DataSource};
use crate::model::FeedError;

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

/// Performs a single GET. Implementations must not retry on their own.
pub trait Transport: Sync {
    fn get(&self, url: &str, timeout: Duration) -> Result<String, FeedError>;
}

/// Live transport over a blocking reqwest client.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, FeedError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("auromon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FeedError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, timeout: Duration) -> Result<String, FeedError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .header("Accept", "application/json, text/plain")
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    FeedError::Timeout
                } else {
                    FeedError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(FeedError::Http(response.status().as_u16()));
        }

        response.text().map_err(|e| FeedError::Transport(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Json(Value),
    Text(String),
}

impl RawPayload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            RawPayload::Json(v) => Some(v),
            RawPayload::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawPayload::Text(t) => Some(t.as_str()),
            RawPayload::Json(_) => None,
        }
    }

    /// Top-level element count (array length, object size, text lines).
    pub fn row_count(&self) -> usize {
        match self {
            RawPayload::Json(Value::Array(rows)) => rows.len(),
            RawPayload::Json(Value::Object(map)) => map.len(),
            RawPayload::Json(_) => 1,
            RawPayload::Text(t) => t.lines().filter(|l| !l.trim().is_empty()).count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Payload(RawPayload),
    /// Every attempt failed; carries the last failure and the attempt count.
    Unavailable { last_error: FeedError, attempts: u32 },
}

impl FetchOutcome {
    pub fn payload(&self) -> Option<&RawPayload> {
        match self {
            FetchOutcome::Payload(p) => Some(p),
            FetchOutcome::Unavailable { .. } => None,
        }
    }

    pub fn json(&self) -> Option<&Value> {
        self.payload().and_then(RawPayload::as_json)
    }

    pub fn text(&self) -> Option<&str> {
        self.payload().and_then(RawPayload::as_text)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, FetchOutcome::Payload(_))
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

pub struct ResilientFetcher<'t, T: Transport + ?Sized> {
    transport: &'t T,
    backoff: Duration,
}

impl<'t, T: Transport + ?Sized> ResilientFetcher<'t, T> {
    pub fn new(transport: &'t T, backoff: Duration) -> Self {
        Self { transport, backoff }
    }

    /// Fetches one feed under its retry policy. Never panics, never errors.
    pub fn fetch(&self, feed: &FeedConfig) -> FetchOutcome {
        let max_attempts = feed.max_retries.max(1);
        let mut last_error = FeedError::Transport("no attempt made".to_string());

        for attempt in 1..=max_attempts {
            let result = self
                .transport
                .get(&feed.url, feed.timeout)
                .and_then(|body| decode(&body, feed.kind));

            match result {
                Ok(payload) => {
                    if attempt > 1 {
                        logging::info(
                            DataSource::Swpc,
                            Some(&feed.name),
                            &format!("recovered on attempt {}/{}", attempt, max_attempts),
                        );
                    }
                    return FetchOutcome::Payload(payload);
                }
                Err(e) => {
                    logging::debug(
                        DataSource::Swpc,
                        Some(&feed.name),
                        &format!("attempt {}/{} failed: {}", attempt, max_attempts, e),
                    );
                    last_error = e;
                }
            }

            if attempt < max_attempts && !self.backoff.is_zero() {
                std::thread::sleep(self.backoff);
            }
        }

        logging::log_fetch_failure(
            &feed.name,
            &format!("fetch after {} attempts", max_attempts),
            &last_error,
        );
        FetchOutcome::Unavailable { last_error, attempts: max_attempts }
    }
}

/// Decodes a body as the feed's payload kind. Malformed JSON is a failed
/// attempt; text is accepted as-is.
pub fn decode(body: &str, kind: PayloadKind) -> Result<RawPayload, FeedError> {
    match kind {
        PayloadKind::Json => serde_json::from_str::<Value>(body)
            .map(RawPayload::Json)
            .map_err(|e| FeedError::Parse(e.to_string())),
        PayloadKind::Text => Ok(RawPayload::Text(body.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
