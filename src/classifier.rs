use std::collections::BTreeSet;

use crate::{
    scoring::{
        FEVER_THRESHOLD_F, ScoreResult, age_risk, bp_risk, parse_temperature, temperature_risk,
    },
    types::{AssessmentPayload, PatientRecord},
};

pub const HIGH_RISK_THRESHOLD: u32 = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordAssessment {
    pub patient_id: String,
    pub blood_pressure: ScoreResult,
    pub temperature: ScoreResult,
    pub age: ScoreResult,
    pub fever: bool,
}

impl RecordAssessment {
    pub fn total_score(&self) -> u32 {
        self.blood_pressure.effective_score()
            + self.temperature.effective_score()
            + self.age.effective_score()
    }

    pub fn has_invalid_field(&self) -> bool {
        self.blood_pressure.is_invalid || self.temperature.is_invalid || self.age.is_invalid
    }

    pub fn is_high_risk(&self) -> bool {
        self.total_score() >= HIGH_RISK_THRESHOLD
    }
}

/// Scores one record. Returns `None` when the record has no usable identifier.
pub fn assess(record: &PatientRecord) -> Option<RecordAssessment> {
    let patient_id = record.identifier()?;
    let temperature = temperature_risk(record.temperature.as_ref());
    let fever = !temperature.is_invalid
        && record
            .temperature
            .as_ref()
            .and_then(parse_temperature)
            .is_some_and(|value| value >= FEVER_THRESHOLD_F);

    Some(RecordAssessment {
        patient_id,
        blood_pressure: bp_risk(record.blood_pressure.as_ref()),
        temperature,
        age: age_risk(record.age.as_ref()),
        fever,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationSummary {
    pub records_seen: usize,
    pub records_skipped: usize,
    pub distinct_patients: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    high_risk: BTreeSet<String>,
    fever: BTreeSet<String>,
    data_quality_issues: BTreeSet<String>,
    scored: BTreeSet<String>,
    records_seen: usize,
    records_skipped: usize,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, record: &PatientRecord) {
        self.records_seen += 1;
        let Some(assessment) = assess(record) else {
            self.records_skipped += 1;
            tracing::warn!(
                target: "classifier",
                record_index = self.records_seen - 1,
                raw_id = ?record.patient_id,
                "record_skipped_missing_id"
            );
            return;
        };

        tracing::debug!(
            target: "classifier",
            patient_id = %assessment.patient_id,
            bp_score = assessment.blood_pressure.score,
            temp_score = assessment.temperature.score,
            age_score = assessment.age.score,
            total_score = assessment.total_score(),
            invalid_field = assessment.has_invalid_field(),
            fever = assessment.fever,
            "record_assessed"
        );

        if assessment.has_invalid_field() {
            self.data_quality_issues.insert(assessment.patient_id.clone());
        }
        if assessment.is_high_risk() {
            self.high_risk.insert(assessment.patient_id.clone());
        }
        if assessment.fever {
            self.fever.insert(assessment.patient_id.clone());
        }
        self.scored.insert(assessment.patient_id);
    }

    pub fn summary(&self) -> ClassificationSummary {
        ClassificationSummary {
            records_seen: self.records_seen,
            records_skipped: self.records_skipped,
            distinct_patients: self.scored.len(),
        }
    }

    pub fn finish(self) -> Classification {
        let summary = self.summary();
        Classification {
            payload: AssessmentPayload {
                high_risk_patients: self.high_risk.into_iter().collect(),
                fever_patients: self.fever.into_iter().collect(),
                data_quality_issues: self.data_quality_issues.into_iter().collect(),
            },
            summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub payload: AssessmentPayload,
    pub summary: ClassificationSummary,
}

pub fn classify(records: &[PatientRecord]) -> Classification {
    let mut classifier = Classifier::new();
    for record in records {
        classifier.observe(record);
    }
    let classification = classifier.finish();

    tracing::info!(
        target: "classifier",
        records_seen = classification.summary.records_seen,
        records_skipped = classification.summary.records_skipped,
        distinct_patients = classification.summary.distinct_patients,
        high_risk = classification.payload.high_risk_patients.len(),
        fever = classification.payload.fever_patients.len(),
        data_quality_issues = classification.payload.data_quality_issues.len(),
        "classification_completed"
    );
    classification
}
