//! End-to-end tests for the daily job against a mocked data API
//!
//! These tests validate:
//! - Early stop once a page reaches back past the window
//! - Checkpoint advance and artifact naming
//! - Retry of transient failures and fast failure on client errors

use chrono::NaiveDate;
use regwatch_common::{Record, RegwatchError};
use regwatch_ingest::{config::JobConfig, job::DailyJob};
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const RESOURCE: &str = "company-master";
const SORT_KEY: &str = "sort[date_of_registration]";

fn company(cin: &str, date: &str) -> Value {
    json!({
        "cin": cin,
        "company_name": format!("{cin} PRIVATE LIMITED"),
        "date_of_registration": date,
        "company_status": "Active",
    })
}

fn page(records: Vec<Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "status": "ok", "records": records }))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn test_config(server: &MockServer, dir: &TempDir) -> JobConfig {
    JobConfig {
        api_key: Some("test-key".into()),
        resource_id: Some(RESOURCE.into()),
        base_url: format!("{}/resource", server.uri()),
        page_limit: 5,
        retry_base_delay_ms: 1,
        state_dir: dir.path().join(".state"),
        out_dir: dir.path().join("out"),
        ..JobConfig::default()
    }
}

fn write_checkpoint(dir: &Path, iso: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        dir.join("last_run.json"),
        json!({ "last_run_iso": iso }).to_string(),
    )
    .unwrap();
}

fn read_checkpoint(dir: &Path) -> String {
    let raw = std::fs::read_to_string(dir.join("last_run.json")).unwrap();
    let json: Value = serde_json::from_str(&raw).unwrap();
    json["last_run_iso"].as_str().unwrap().to_string()
}

fn page_mock(offset: &str) -> wiremock::MockBuilder {
    Mock::given(method("GET"))
        .and(path(format!("/resource/{RESOURCE}")))
        .and(query_param("api-key", "test-key"))
        .and(query_param("format", "json"))
        .and(query_param("limit", "5"))
        .and(query_param("offset", offset))
        .and(query_param(SORT_KEY, "desc"))
}

fn sample_mock() -> wiremock::MockBuilder {
    Mock::given(method("GET"))
        .and(path(format!("/resource/{RESOURCE}")))
        .and(query_param("limit", "50"))
        .and(query_param("offset", "0"))
}

#[tokio::test]
async fn test_daily_run_stops_after_window_is_covered() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    write_checkpoint(&config.state_dir, "2024-01-01");

    sample_mock()
        .respond_with(page(vec![company("U10", "2024-01-10")]))
        .expect(1)
        .mount(&server)
        .await;

    page_mock("0")
        .respond_with(page(vec![
            company("U10", "2024-01-10"),
            company("U09", "09-01-2024"),
            company("U08", "2024-01-08"),
            company("U07", "2024/01/07"),
            company("U06", "2024-01-06"),
        ]))
        .expect(1)
        .mount(&server)
        .await;

    page_mock("5")
        .respond_with(page(vec![
            company("U03", "2024-01-03"),
            company("U02", "2024-01-02"),
            company("X31", "2023-12-31"),
            company("X25", "2023-12-25"),
            company("X20", "2023-12-20"),
        ]))
        .expect(1)
        .mount(&server)
        .await;

    page_mock("10")
        .respond_with(page(vec![company("X01", "2023-12-01")]))
        .expect(0)
        .mount(&server)
        .await;

    let state_dir = config.state_dir.clone();
    let out_dir = config.out_dir.clone();
    let report = DailyJob::new(config).run_for(date(2024, 1, 10)).await.unwrap();

    assert_eq!(report.count, 7);
    assert_eq!(report.from, date(2024, 1, 1));
    assert_eq!(report.to, date(2024, 1, 10));
    assert_eq!(read_checkpoint(&state_dir), "2024-01-10");

    let json_path = out_dir.join("new_companies_2024-01-10.json");
    assert_eq!(report.files.json.as_deref(), Some(json_path.as_path()));
    assert!(out_dir.join("new_companies_2024-01-10.csv").exists());
    assert!(out_dir.join("new_companies_2024-01-10.xlsx").exists());

    let written: Vec<Record> =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    let cins: Vec<_> = written.iter().map(|r| r["cin"].as_str().unwrap()).collect();
    assert_eq!(cins, vec!["U02", "U03", "U06", "U07", "U08", "U09", "U10"]);

    let csv = std::fs::read_to_string(out_dir.join("new_companies_2024-01-10.csv")).unwrap();
    assert_eq!(csv.lines().count(), 8);
    assert!(csv.starts_with("cin,company_name,date_of_registration,company_status\n"));
}

#[tokio::test]
async fn test_empty_feed_advances_checkpoint_without_files() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    write_checkpoint(&config.state_dir, "2024-01-01");

    sample_mock()
        .respond_with(page(Vec::new()))
        .expect(1)
        .mount(&server)
        .await;

    let state_dir = config.state_dir.clone();
    let out_dir = config.out_dir.clone();
    let report = DailyJob::new(config).run_for(date(2024, 1, 10)).await.unwrap();

    assert_eq!(report.count, 0);
    assert!(report.files.is_empty());
    assert_eq!(
        serde_json::to_value(&report).unwrap(),
        json!({ "count": 0, "from": "2024-01-01", "to": "2024-01-10", "files": {} })
    );
    assert_eq!(read_checkpoint(&state_dir), "2024-01-10");
    assert!(!out_dir.exists());
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);

    sample_mock()
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream busy"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    sample_mock()
        .respond_with(page(vec![company("U10", "2024-01-10")]))
        .expect(1)
        .mount(&server)
        .await;
    page_mock("0")
        .respond_with(page(vec![company("U10", "2024-01-10"), company("U09", "2024-01-09")]))
        .expect(1)
        .mount(&server)
        .await;

    let report = DailyJob::new(config).run_for(date(2024, 1, 10)).await.unwrap();

    assert_eq!(report.count, 2);
    assert_eq!(report.from, date(2024, 1, 3));
}

#[tokio::test]
async fn test_client_error_fails_without_retry() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir);
    write_checkpoint(&config.state_dir, "2024-01-01");

    sample_mock()
        .respond_with(ResponseTemplate::new(404).set_body_string("no such resource"))
        .expect(1)
        .mount(&server)
        .await;

    let state_dir = config.state_dir.clone();
    let err = DailyJob::new(config).run_for(date(2024, 1, 10)).await.unwrap_err();

    match err {
        RegwatchError::Http { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such resource");
        },
        other => panic!("expected HTTP error, got {other:?}"),
    }
    assert_eq!(read_checkpoint(&state_dir), "2024-01-01");
}

#[tokio::test]
async fn test_persistent_server_error_exhausts_retries() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = JobConfig {
        max_retries: 2,
        ..test_config(&server, &dir)
    };

    sample_mock()
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let err = DailyJob::new(config).run_for(date(2024, 1, 10)).await.unwrap_err();

    assert!(matches!(err, RegwatchError::RetriesExhausted { attempts: 3, .. }));
}

#[tokio::test]
async fn test_missing_credentials_never_hit_the_network() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = JobConfig {
        api_key: None,
        ..test_config(&server, &dir)
    };

    Mock::given(method("GET"))
        .respond_with(page(Vec::new()))
        .expect(0)
        .mount(&server)
        .await;

    let err = DailyJob::new(config).run_for(date(2024, 1, 10)).await.unwrap_err();

    assert_eq!(err.to_string(), "Missing DGI_API_KEY/DGI_RESOURCE_ID");
}
