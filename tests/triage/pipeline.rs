use std::sync::Arc;

use serde_json::json;

use triage::{
    config::{ApiConfig, Config},
    credentials::CredentialRef,
    error::FetchError,
    paginator::PaginationError,
    pipeline::{RunOptions, TriageRun},
    telemetry::NoopTelemetrySink,
};

use crate::support::{RecordingSleeper, ScriptedTransport, ms, respond_json, respond_text};

fn config() -> Config {
    let mut api = ApiConfig::new("http://api.test");
    api.credential = CredentialRef::InlineToken {
        token: "ak_test".to_string(),
    };
    Config::new(api)
}

fn run(transport: &ScriptedTransport, sleeper: &RecordingSleeper) -> TriageRun {
    TriageRun::with_transport(
        &config(),
        Arc::new(transport.clone()),
        Arc::new(sleeper.clone()),
        Arc::new(NoopTelemetrySink),
    )
    .expect("run should build")
}

fn two_pages() -> Vec<crate::support::Scripted> {
    vec![
        respond_json(
            200,
            json!({
                "data": [
                    {"patient_id": "DEMO002", "blood_pressure": "150/95", "temperature": 103, "age": 70},
                    {"patient_id": "DEMO001", "blood_pressure": "N/A", "temperature": 98, "age": 30}
                ],
                "pagination": {"page": 1, "limit": 20, "total": 3, "totalPages": 2, "hasNext": true}
            }),
        ),
        respond_json(
            200,
            json!({
                "data": [
                    {"patient_id": "DEMO003", "blood_pressure": "118/76", "temperature": 99.7, "age": 45}
                ],
                "pagination": {"page": 2, "limit": 20, "total": 3, "totalPages": 2, "hasNext": false}
            }),
        ),
    ]
}

#[tokio::test]
async fn given_two_pages_when_run_then_classified_payload_is_submitted() {
    let mut script = two_pages();
    script.push(respond_json(
        200,
        json!({"success": true, "results": {"score": 100}}),
    ));
    let transport = ScriptedTransport::new(script);
    let sleeper = RecordingSleeper::default();

    let outcome = run(&transport, &sleeper)
        .execute(RunOptions::default())
        .await
        .expect("run should succeed");

    assert_eq!(outcome.records_fetched, 3);
    assert_eq!(outcome.payload.high_risk_patients, vec!["DEMO002"]);
    assert_eq!(outcome.payload.fever_patients, vec!["DEMO002", "DEMO003"]);
    assert_eq!(outcome.payload.data_quality_issues, vec!["DEMO001"]);
    assert!(outcome.submission.expect("submitted").success);

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(
        requests[2].body,
        Some(json!({
            "high_risk_patients": ["DEMO002"],
            "fever_patients": ["DEMO002", "DEMO003"],
            "data_quality_issues": ["DEMO001"]
        }))
    );
    assert_eq!(sleeper.sleeps(), vec![ms(250)]);
}

#[tokio::test]
async fn given_dry_run_when_run_then_nothing_is_submitted() {
    let transport = ScriptedTransport::new(two_pages());
    let sleeper = RecordingSleeper::default();

    let outcome = run(&transport, &sleeper)
        .execute(RunOptions { dry_run: true })
        .await
        .expect("dry run should succeed");

    assert!(outcome.submission.is_none());
    assert_eq!(outcome.payload.high_risk_patients, vec!["DEMO002"]);
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn given_rejected_submission_when_run_then_run_still_succeeds() {
    let mut script = two_pages();
    script.push(respond_json(200, json!({"success": false, "message": "no more attempts"})));
    let transport = ScriptedTransport::new(script);
    let sleeper = RecordingSleeper::default();

    let outcome = run(&transport, &sleeper)
        .execute(RunOptions::default())
        .await
        .expect("negative verdict does not fail the run");

    let submission = outcome.submission.expect("submitted");
    assert!(!submission.success);
    assert_eq!(submission.message.as_deref(), Some("no more attempts"));
}

#[tokio::test]
async fn given_unrecoverable_fetch_when_run_then_error_aborts_before_submit() {
    let transport = ScriptedTransport::new((0..5).map(|_| respond_text(503, "down")).collect());
    let sleeper = RecordingSleeper::default();

    let err = run(&transport, &sleeper)
        .execute(RunOptions::default())
        .await
        .expect_err("exhausted fetch is fatal");

    assert!(err.chain().any(|cause| cause.downcast_ref::<PaginationError>().is_some()));
    assert!(format!("{err:#}").contains("5 attempts"));
    assert_eq!(transport.requests().len(), 5);
}

#[tokio::test]
async fn given_unrecoverable_submit_when_run_then_error_is_fatal() {
    let mut script = two_pages();
    script.push(respond_text(403, "forbidden"));
    let transport = ScriptedTransport::new(script);
    let sleeper = RecordingSleeper::default();

    let err = run(&transport, &sleeper)
        .execute(RunOptions::default())
        .await
        .expect_err("403 on submit is fatal");

    assert!(err.chain().any(|cause| cause.downcast_ref::<FetchError>().is_some()));
    assert!(err.to_string().contains("submit"));
}

#[test]
fn given_blank_credential_when_run_built_then_construction_fails() {
    let mut config = config();
    config.api.credential = CredentialRef::InlineToken {
        token: " ".to_string(),
    };

    let result = TriageRun::with_transport(
        &config,
        Arc::new(ScriptedTransport::default()),
        Arc::new(RecordingSleeper::default()),
        Arc::new(NoopTelemetrySink),
    );

    assert!(result.is_err());
}

#[tokio::test]
async fn given_malformed_entries_when_run_then_they_are_skipped_and_submission_happens() {
    let transport = ScriptedTransport::new(vec![
        respond_json(
            200,
            json!({
                "data": [
                    {"patient_id": "DEMO002", "id": "DEMO002", "blood_pressure": "150/95", "temperature": 103, "age": 70},
                    null,
                    ["not", "a", "record"],
                    {"patient_id": "DEMO001", "blood_pressure": " 120/80", "temperature": 98, "age": 30}
                ],
                "pagination": {"hasNext": false}
            }),
        ),
        respond_json(200, json!({"success": true})),
    ]);
    let sleeper = RecordingSleeper::default();

    let outcome = run(&transport, &sleeper)
        .execute(RunOptions::default())
        .await
        .expect("malformed entries do not abort the run");

    assert_eq!(outcome.records_fetched, 4);
    assert_eq!(outcome.summary.records_seen, 4);
    assert_eq!(outcome.summary.records_skipped, 2);
    assert_eq!(outcome.summary.distinct_patients, 2);
    assert!(outcome.submission.expect("submitted").success);

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[1].body,
        Some(json!({
            "high_risk_patients": ["DEMO002"],
            "fever_patients": ["DEMO002"],
            "data_quality_issues": ["DEMO001"]
        }))
    );
}
