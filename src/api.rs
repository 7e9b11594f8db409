use serde_json::Value;

use crate::{
    error::{FetchError, protocol_error},
    transport::ApiRequest,
    types::AssessmentPayload,
};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Builds the requests the batch sends to the assessment API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientApi {
    base_url: String,
    api_key: Option<String>,
}

impl PatientApi {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, api_key }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn list_patients(&self, page: u32, limit: u32) -> ApiRequest {
        let request = ApiRequest::get(format!("{}/patients", self.base_url))
            .with_query("page", page)
            .with_query("limit", limit);
        self.authorize(request)
    }

    pub fn submit_assessment(&self, payload: &AssessmentPayload) -> Result<ApiRequest, FetchError> {
        let body: Value = serde_json::to_value(payload)
            .map_err(|err| protocol_error(format!("failed to encode assessment payload: {}", err)))?;
        let request = ApiRequest::post_json(format!("{}/submit-assessment", self.base_url), body);
        Ok(self.authorize(request))
    }

    fn authorize(&self, request: ApiRequest) -> ApiRequest {
        match &self.api_key {
            Some(key) => request.with_header(API_KEY_HEADER, key.clone()),
            None => request,
        }
    }
}
