use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};

use crate::{
    api::PatientApi,
    classifier::{ClassificationSummary, classify},
    config::Config,
    credentials::resolve_api_key,
    fetcher::BackoffFetcher,
    paginator::Paginator,
    reliability::{Sleeper, TokioSleeper},
    submitter::Submitter,
    telemetry::{TelemetrySink, TracingTelemetrySink},
    transport::{HttpTransport, Transport},
    types::{AssessmentPayload, SubmissionResult},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub records_fetched: usize,
    pub payload: AssessmentPayload,
    pub summary: ClassificationSummary,
    /// `None` on a dry run.
    pub submission: Option<SubmissionResult>,
}

/// One batch run: fetch every page, classify, submit.
pub struct TriageRun {
    paginator: Paginator,
    submitter: Submitter,
}

impl TriageRun {
    pub fn new(paginator: Paginator, submitter: Submitter) -> Self {
        Self {
            paginator,
            submitter,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(Duration::from_millis(config.api.request_timeout_ms))
            .context("failed to construct http transport")?;
        Self::with_transport(
            config,
            Arc::new(transport),
            Arc::new(TokioSleeper),
            Arc::new(TracingTelemetrySink),
        )
    }

    pub fn with_transport(
        config: &Config,
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Result<Self> {
        let api_key =
            resolve_api_key(&config.api.credential).context("failed to resolve api key")?;
        let api = PatientApi::new(config.api.base_url.clone(), api_key);
        let fetcher = Arc::new(
            BackoffFetcher::new(transport, &config.retry)
                .with_sleeper(Arc::clone(&sleeper))
                .with_telemetry(telemetry),
        );

        let paginator = Paginator::new(Arc::clone(&fetcher), api.clone(), config.pagination.clone())
            .with_sleeper(sleeper);
        let submitter = Submitter::new(fetcher, api);
        Ok(Self::new(paginator, submitter))
    }

    pub async fn execute(&self, options: RunOptions) -> Result<RunOutcome> {
        let records = self
            .paginator
            .fetch_all()
            .await
            .context("failed to fetch patient pages")?;
        let records_fetched = records.len();

        let classification = classify(&records);

        if options.dry_run {
            tracing::info!(
                target: "pipeline",
                payload = %serde_json::to_string(&classification.payload).unwrap_or_default(),
                "dry_run_submission_skipped"
            );
            return Ok(RunOutcome {
                records_fetched,
                payload: classification.payload,
                summary: classification.summary,
                submission: None,
            });
        }

        let submission = self
            .submitter
            .submit(&classification.payload)
            .await
            .context("failed to submit assessment")?;
        log_submission(&submission);

        Ok(RunOutcome {
            records_fetched,
            payload: classification.payload,
            summary: classification.summary,
            submission: Some(submission),
        })
    }
}

fn log_submission(submission: &SubmissionResult) {
    let score = submission.results.as_ref().and_then(|results| results.score);
    if submission.success {
        tracing::info!(
            target: "pipeline",
            score = ?score,
            message = submission.message.as_deref().unwrap_or("-"),
            "submission_accepted"
        );
    } else {
        tracing::warn!(
            target: "pipeline",
            score = ?score,
            message = submission.message.as_deref().unwrap_or("-"),
            "submission_rejected"
        );
    }

    if let Some(results) = &submission.results {
        for (key, value) in &results.extra {
            tracing::info!(target: "pipeline", field = %key, value = %value, "submission_result_field");
        }
    }
}
