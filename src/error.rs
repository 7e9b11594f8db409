use std::fmt;

use serde::{Deserialize, Serialize};

const BODY_EXCERPT_CHARS: usize = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    RateLimited,
    ServerTransient,
    Transport,
    HttpStatus,
    Protocol,
    RetriesExhausted,
}

#[derive(Debug, Clone)]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
    pub retryable: bool,
    pub url: Option<String>,
    pub http_status: Option<u16>,
    pub attempts: Option<u32>,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: matches!(
                kind,
                FetchErrorKind::RateLimited
                    | FetchErrorKind::ServerTransient
                    | FetchErrorKind::Transport
            ),
            url: None,
            http_status: None,
            attempts: None,
        }
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut details = Vec::new();
        if let Some(url) = &self.url {
            details.push(format!("url={}", url));
        }
        if let Some(status) = self.http_status {
            details.push(format!("status={}", status));
        }
        if let Some(attempts) = self.attempts {
            details.push(format!("attempts={}", attempts));
        }

        if details.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} ({})", self.message, details.join(", "))
        }
    }
}

impl std::error::Error for FetchError {}

/// Maps a non-2xx status to an error. Statuses in `retryable_statuses` are
/// transient, everything else fails the request immediately.
pub fn map_http_status(status: u16, body: &str, retryable_statuses: &[u16]) -> FetchError {
    let retryable = retryable_statuses.contains(&status);
    let kind = match (status, retryable) {
        (429, true) => FetchErrorKind::RateLimited,
        (_, true) => FetchErrorKind::ServerTransient,
        (_, false) => FetchErrorKind::HttpStatus,
    };

    let mut message = format!("server returned status {}", status);
    let excerpt = body_excerpt(body);
    if !excerpt.is_empty() {
        message = format!("{}: {}", message, excerpt);
    }

    FetchError::new(kind, message)
        .with_retryable(retryable)
        .with_http_status(status)
}

pub fn protocol_error(message: impl Into<String>) -> FetchError {
    FetchError::new(FetchErrorKind::Protocol, message).with_retryable(false)
}

pub fn retries_exhausted(url: &str, attempts: u32, last_error: &FetchError) -> FetchError {
    let mut err = FetchError::new(
        FetchErrorKind::RetriesExhausted,
        format!(
            "request to {} failed after {} attempts; last error: {}",
            url, attempts, last_error.message
        ),
    )
    .with_retryable(false)
    .with_url(url)
    .with_attempts(attempts);
    err.http_status = last_error.http_status;
    err
}

pub fn body_excerpt(body: &str) -> String {
    body.trim().chars().take(BODY_EXCERPT_CHARS).collect()
}
