use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// One patient as returned by `GET /patients`.
///
/// Scored fields are kept as raw JSON so that malformed values reach the
/// scoring functions instead of failing the whole page. Decoding never fails:
/// an entry that is not an object becomes a record without an identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct PatientRecord {
    pub patient_id: Option<Value>,
    pub blood_pressure: Option<Value>,
    pub temperature: Option<Value>,
    pub age: Option<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl From<Value> for PatientRecord {
    fn from(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self::default();
        };

        // `id` is only a fallback; when both are present it stays in `extra`.
        let patient_id =
            take_field(&mut fields, "patient_id").or_else(|| take_field(&mut fields, "id"));
        Self {
            patient_id,
            blood_pressure: take_field(&mut fields, "blood_pressure"),
            temperature: take_field(&mut fields, "temperature"),
            age: take_field(&mut fields, "age"),
            extra: fields.into_iter().collect(),
        }
    }
}

fn take_field(fields: &mut Map<String, Value>, key: &str) -> Option<Value> {
    fields.remove(key).filter(|value| !value.is_null())
}

/// Reads an optional field, treating a value of the wrong shape as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

impl PatientRecord {
    /// Returns the identifier when it is a non-blank string or an integer.
    pub fn identifier(&self) -> Option<String> {
        match self.patient_id.as_ref()? {
            Value::String(id) => {
                let trimmed = id.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(number) if number.is_i64() || number.is_u64() => {
                Some(number.to_string())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default, deserialize_with = "lenient")]
    pub has_next: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub has_previous: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub page: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub limit: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub total: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub total_pages: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageEnvelope {
    #[serde(default, deserialize_with = "lenient")]
    pub data: Option<Vec<PatientRecord>>,
    #[serde(default, deserialize_with = "lenient")]
    pub pagination: Option<Pagination>,
}

impl PageEnvelope {
    pub fn has_next(&self) -> bool {
        self.pagination
            .as_ref()
            .and_then(|pagination| pagination.has_next)
            .unwrap_or(false)
    }
}

/// Body of `POST /submit-assessment`. Every list is sorted and duplicate-free.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentPayload {
    pub high_risk_patients: Vec<String>,
    pub fever_patients: Vec<String>,
    pub data_quality_issues: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResults {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub results: Option<AssessmentResults>,
}
