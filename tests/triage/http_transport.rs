use std::{sync::Arc, time::Duration};

use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path, query_param},
};

use triage::{
    config::{ApiConfig, Config, RetryConfig},
    credentials::CredentialRef,
    error::FetchErrorKind,
    fetcher::BackoffFetcher,
    pipeline::{RunOptions, TriageRun},
    reliability::TokioSleeper,
    telemetry::NoopTelemetrySink,
    transport::{ApiRequest, HttpTransport},
};

fn fast_config(base_url: &str) -> Config {
    let mut api = ApiConfig::new(base_url);
    api.credential = CredentialRef::InlineToken {
        token: "ak_wire".to_string(),
    };
    api.request_timeout_ms = 2_000;
    let mut config = Config::new(api);
    config.retry.initial_delay_ms = 5;
    config.pagination.page_delay_ms = 1;
    config
}

fn http_run(config: &Config) -> TriageRun {
    let transport = HttpTransport::new(Duration::from_millis(config.api.request_timeout_ms))
        .expect("http transport should build");
    TriageRun::with_transport(
        config,
        Arc::new(transport),
        Arc::new(TokioSleeper),
        Arc::new(NoopTelemetrySink),
    )
    .expect("run should build")
}

#[tokio::test]
async fn given_live_server_with_two_pages_when_run_then_payload_reaches_submit_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/patients"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "20"))
        .and(header("x-api-key", "ak_wire"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"patient_id": "DEMO001", "name": "TestPatient, John", "age": 66,
                 "gender": "M", "blood_pressure": "120/80", "temperature": 98.6}
            ],
            "pagination": {"page": 1, "limit": 20, "total": 2, "totalPages": 2,
                           "hasNext": true, "hasPrevious": false}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/patients"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"patient_id": "DEMO002", "age": 67, "blood_pressure": "140/90", "temperature": 101.2}
            ],
            "pagination": {"page": 2, "limit": 20, "total": 2, "totalPages": 2,
                           "hasNext": false, "hasPrevious": true}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/submit-assessment"))
        .and(header("x-api-key", "ak_wire"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "high_risk_patients": ["DEMO001", "DEMO002"],
            "fever_patients": ["DEMO002"],
            "data_quality_issues": []
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Assessment submitted successfully",
            "results": {"score": 100}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = http_run(&fast_config(&server.uri()))
        .execute(RunOptions::default())
        .await
        .expect("run against mock server should succeed");

    assert_eq!(outcome.records_fetched, 2);
    let submission = outcome.submission.expect("submitted");
    assert!(submission.success);
    assert_eq!(submission.results.and_then(|r| r.score), Some(100.0));
}

#[tokio::test]
async fn given_flaky_server_when_fetched_over_http_then_503s_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/patients"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .with_priority(2)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(Duration::from_secs(2)).expect("transport");
    let retry = RetryConfig {
        initial_delay_ms: 5,
        ..RetryConfig::default()
    };
    let fetcher = BackoffFetcher::new(Arc::new(transport), &retry);
    let request = ApiRequest::get(format!("{}/patients", server.uri())).with_query("page", 1);

    let body: Value = fetcher.fetch(&request).await.expect("third attempt succeeds");

    assert_eq!(body, json!({"data": []}));
    let received = server.received_requests().await.expect("recording enabled");
    assert_eq!(received.len(), 3);
}

#[tokio::test]
async fn given_unreachable_server_when_fetched_then_transport_failures_exhaust_budget() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let uri = format!("http://{}", listener.local_addr().expect("local addr"));
    drop(listener);

    let transport = HttpTransport::new(Duration::from_millis(500)).expect("transport");
    let retry = RetryConfig {
        max_attempts: 2,
        initial_delay_ms: 1,
        ..RetryConfig::default()
    };
    let fetcher = BackoffFetcher::new(Arc::new(transport), &retry);

    let err = fetcher
        .fetch::<Value>(&ApiRequest::get(format!("{}/patients", uri)))
        .await
        .expect_err("nothing is listening");

    assert_eq!(err.kind, FetchErrorKind::RetriesExhausted);
    assert_eq!(err.attempts, Some(2));
}

#[tokio::test]
async fn given_unauthorized_key_when_run_then_run_fails_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/patients"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid API key"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = http_run(&fast_config(&server.uri()))
        .execute(RunOptions::default())
        .await
        .expect_err("401 is fatal");

    assert!(format!("{err:#}").contains("401"));
}
