use std::sync::Arc;

use crate::{
    api::PatientApi,
    error::FetchError,
    fetcher::BackoffFetcher,
    types::{AssessmentPayload, SubmissionResult},
};

pub struct Submitter {
    fetcher: Arc<BackoffFetcher>,
    api: PatientApi,
}

impl Submitter {
    pub fn new(fetcher: Arc<BackoffFetcher>, api: PatientApi) -> Self {
        Self { fetcher, api }
    }

    /// Posts the payload and returns the server's verdict as-is. A
    /// `success: false` verdict is a normal return, not an error.
    pub async fn submit(&self, payload: &AssessmentPayload) -> Result<SubmissionResult, FetchError> {
        let request = self.api.submit_assessment(payload)?;
        tracing::info!(
            target: "submitter",
            url = %request.url,
            high_risk = payload.high_risk_patients.len(),
            fever = payload.fever_patients.len(),
            data_quality_issues = payload.data_quality_issues.len(),
            "submission_started"
        );
        self.fetcher.fetch(&request).await
    }
}
