use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::{
    config::RetryConfig,
    error::{FetchError, body_excerpt, map_http_status, protocol_error, retries_exhausted},
    reliability::{RetryError, RetryPolicy, Sleeper, TokioSleeper, retry_with_backoff},
    telemetry::{FetchEvent, NoopTelemetrySink, TelemetrySink},
    transport::{ApiRequest, Transport},
};

/// Issues one logical request, retrying transient failures with exponential
/// backoff and surfacing permanent failures immediately.
pub struct BackoffFetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    retryable_statuses: Vec<u16>,
    sleeper: Arc<dyn Sleeper>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl BackoffFetcher {
    pub fn new(transport: Arc<dyn Transport>, retry: &RetryConfig) -> Self {
        Self {
            transport,
            policy: RetryPolicy::from_config(retry),
            retryable_statuses: retry.retryable_statuses.clone(),
            sleeper: Arc::new(TokioSleeper),
            telemetry: Arc::new(NoopTelemetrySink),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn fetch<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, FetchError> {
        let url = request.describe();
        let url_ref = url.as_str();
        let result = retry_with_backoff(
            &self.policy,
            self.sleeper.as_ref(),
            move |attempt| self.attempt::<T>(request, url_ref, attempt),
            |err: &FetchError| err.retryable,
        )
        .await;

        match result {
            Ok(value) => Ok(value),
            Err(RetryError::Permanent { error, attempts }) => {
                self.telemetry.on_event(FetchEvent::RequestFailed {
                    url: url.clone(),
                    attempts,
                    kind: error.kind,
                });
                Err(error.with_attempts(attempts))
            }
            Err(RetryError::Exhausted {
                last_error,
                attempts,
            }) => {
                let err = retries_exhausted(&url, attempts, &last_error);
                self.telemetry.on_event(FetchEvent::RequestFailed {
                    url: url.clone(),
                    attempts,
                    kind: err.kind,
                });
                Err(err)
            }
        }
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        url: &str,
        attempt: u32,
    ) -> Result<T, FetchError> {
        self.telemetry.on_event(FetchEvent::AttemptStarted {
            url: url.to_string(),
            attempt,
        });

        let outcome = match self.transport.send(request).await {
            Ok(response) if response.is_success() => parse_body::<T>(&response.body),
            Ok(response) => Err(map_http_status(
                response.status,
                &response.body,
                &self.retryable_statuses,
            )),
            Err(err) => Err(err),
        }
        .map_err(|err| err.with_url(url));

        match &outcome {
            Ok(_) => self.telemetry.on_event(FetchEvent::RequestSucceeded {
                url: url.to_string(),
                attempts: attempt,
            }),
            Err(err) => {
                let retry_in = (err.retryable && self.policy.can_retry(attempt))
                    .then(|| self.policy.backoff_delay(attempt));
                self.telemetry.on_event(FetchEvent::AttemptFailed {
                    url: url.to_string(),
                    attempt,
                    kind: err.kind,
                    http_status: err.http_status,
                    retry_in,
                });
            }
        }

        outcome
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|err| {
        protocol_error(format!(
            "response body is not valid json for the expected shape: {}; body: {}",
            err,
            body_excerpt(body)
        ))
    })
}
