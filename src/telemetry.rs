use std::time::Duration;

use crate::error::FetchErrorKind;

#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent {
    AttemptStarted {
        url: String,
        attempt: u32,
    },
    AttemptFailed {
        url: String,
        attempt: u32,
        kind: FetchErrorKind,
        http_status: Option<u16>,
        retry_in: Option<Duration>,
    },
    RequestSucceeded {
        url: String,
        attempts: u32,
    },
    RequestFailed {
        url: String,
        attempts: u32,
        kind: FetchErrorKind,
    },
}

/// Receives progress notifications from the backoff fetcher.
pub trait TelemetrySink: Send + Sync {
    fn on_event(&self, event: FetchEvent);
}

#[derive(Default)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn on_event(&self, _event: FetchEvent) {}
}

#[derive(Default)]
pub struct TracingTelemetrySink;

impl TelemetrySink for TracingTelemetrySink {
    fn on_event(&self, event: FetchEvent) {
        match event {
            FetchEvent::AttemptStarted { url, attempt } => {
                tracing::debug!(target: "fetcher", url = %url, attempt = attempt, "attempt_started");
            }
            FetchEvent::AttemptFailed {
                url,
                attempt,
                kind,
                http_status,
                retry_in,
            } => match retry_in {
                Some(delay) => tracing::warn!(
                    target: "fetcher",
                    url = %url,
                    attempt = attempt,
                    kind = ?kind,
                    http_status = ?http_status,
                    retry_in_ms = delay.as_millis() as u64,
                    "attempt_failed_retrying"
                ),
                None => tracing::warn!(
                    target: "fetcher",
                    url = %url,
                    attempt = attempt,
                    kind = ?kind,
                    http_status = ?http_status,
                    "attempt_failed"
                ),
            },
            FetchEvent::RequestSucceeded { url, attempts } => {
                tracing::debug!(target: "fetcher", url = %url, attempts = attempts, "request_succeeded");
            }
            FetchEvent::RequestFailed {
                url,
                attempts,
                kind,
            } => {
                tracing::error!(
                    target: "fetcher",
                    url = %url,
                    attempts = attempts,
                    kind = ?kind,
                    "request_failed"
                );
            }
        }
    }
}
