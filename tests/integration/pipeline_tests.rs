//! Integration tests for the mirror pipeline
//!
//! These tests drive `run_pipeline` against wiremock servers with rendering
//! disabled, and check the artifacts, ledgers and checkpoint it leaves behind.

use datasheet_mirror::config::{parse_config, Config};
use datasheet_mirror::journal::RunJournal;
use datasheet_mirror::{run_pipeline, MirrorError};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MIRROR: &str = "https://mirror.example.com/datasheets/";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn out(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn write_records(&self, records: Value) -> PathBuf {
        let path = self.dir.path().join("records.json");
        std::fs::write(&path, serde_json::to_vec_pretty(&records).unwrap()).unwrap();
        path
    }

    fn config(&self, records: &Path, fetch_extra: &str) -> Config {
        let content = format!(
            r#"
[input]
path = "{records}"

[output]
directory = "{out}"
mirror-base = "{MIRROR}"

[fetch]
timeout-secs = 5
user-agents = ["TestAgent/1.0", "TestAgent/2.0"]
{fetch_extra}

[render]
enabled = false
"#,
            records = records.display(),
            out = self.out().display(),
        );
        parse_config(&content).expect("test config should be valid")
    }

    fn read(&self, name: &str) -> Value {
        let raw = std::fs::read_to_string(self.out().join(name))
            .unwrap_or_else(|e| panic!("failed to read {}: {}", name, e));
        serde_json::from_str(&raw).unwrap()
    }

    fn ledger(&self, name: &str) -> Vec<Value> {
        match self.read(name) {
            Value::Array(entries) => entries,
            other => panic!("{} is not an array: {}", name, other),
        }
    }
}

async fn serve_pdf(server: &MockServer, at: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_end_to_end_direct_fetch() {
    let server = MockServer::start().await;
    serve_pdf(&server, "/sheet.pdf", b"%PDF-1.7 datasheet").await;

    let fx = Fixture::new();
    let records = fx.write_records(json!([
        {"ManufacturerProductNumber": "AB/12", "DatasheetUrl": format!("{}/sheet.pdf", server.uri())}
    ]));

    let report = run_pipeline(fx.config(&records, "")).await.unwrap();
    assert_eq!(report.mirrored, 1);

    let outcomes = fx.ledger("output.json");
    assert_eq!(
        outcomes,
        vec![json!({
            "index": 1,
            "partNumber": "AB-12",
            "datasheetUrl": format!("{}AB-12.pdf", MIRROR)
        })]
    );
    assert_eq!(fx.read("state.json"), json!({"lastIndex": 1}));
    assert_eq!(
        std::fs::read(fx.out().join("AB-12.pdf")).unwrap(),
        b"%PDF-1.7 datasheet"
    );
    assert!(!fx.out().join("failed.json").exists());
}

#[tokio::test]
async fn test_null_url_makes_no_requests() {
    let server = MockServer::start().await;

    let fx = Fixture::new();
    let records = fx.write_records(json!([
        {"ManufacturerProductNumber": "NO-SHEET", "DatasheetUrl": null}
    ]));

    let report = run_pipeline(fx.config(&records, "")).await.unwrap();
    assert_eq!(report.unresolvable, 1);

    assert_eq!(
        fx.ledger("output.json"),
        vec![json!({"index": 1, "partNumber": "NO-SHEET", "datasheetUrl": null})]
    );
    let failures = fx.ledger("failed.json");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["reason"], "missing or invalid URL");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_exhaustion_records_single_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fx = Fixture::new();
    let url = format!("{}/gone.pdf", server.uri());
    let records = fx.write_records(json!([
        {"ManufacturerProductNumber": "GONE1", "DatasheetUrl": url}
    ]));

    let report = run_pipeline(fx.config(&records, "")).await.unwrap();
    assert_eq!(report.exhausted, 1);

    let failures = fx.ledger("failed.json");
    assert_eq!(
        failures,
        vec![json!({
            "index": 1,
            "partNumber": "GONE1",
            "datasheetUrl": url,
            "reason": "all strategies exhausted"
        })]
    );
    assert!(!fx.out().join("output.json").exists());
    assert!(!fx.out().join("GONE1.pdf").exists());
    assert_eq!(fx.read("state.json"), json!({"lastIndex": 1}));

    // One request per identity, none from the disabled renderer
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_second_run_changes_nothing() {
    let server = MockServer::start().await;
    serve_pdf(&server, "/a.pdf", b"%PDF a").await;

    let fx = Fixture::new();
    let records = fx.write_records(json!([
        {"ManufacturerProductNumber": "A", "DatasheetUrl": format!("{}/a.pdf", server.uri())},
        {"ManufacturerProductNumber": "B", "DatasheetUrl": ""},
    ]));
    let config = fx.config(&records, "");

    run_pipeline(config.clone()).await.unwrap();
    let outcomes = std::fs::read(fx.out().join("output.json")).unwrap();
    let failures = std::fs::read(fx.out().join("failed.json")).unwrap();
    let requests = server.received_requests().await.unwrap().len();

    let report = run_pipeline(config).await.unwrap();

    assert_eq!(report.processed, 0);
    assert_eq!(std::fs::read(fx.out().join("output.json")).unwrap(), outcomes);
    assert_eq!(std::fs::read(fx.out().join("failed.json")).unwrap(), failures);
    assert_eq!(server.received_requests().await.unwrap().len(), requests);
}

#[tokio::test]
async fn test_resume_skips_settled_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/first.pdf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/second.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF 2".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let fx = Fixture::new();
    std::fs::create_dir_all(fx.out()).unwrap();
    std::fs::write(fx.out().join("state.json"), r#"{"lastIndex": 1}"#).unwrap();

    let records = fx.write_records(json!([
        {"ManufacturerProductNumber": "P1", "DatasheetUrl": format!("{}/first.pdf", server.uri())},
        {"ManufacturerProductNumber": "P2", "DatasheetUrl": format!("{}/second.pdf", server.uri())},
    ]));

    let report = run_pipeline(fx.config(&records, "")).await.unwrap();

    assert_eq!(report.resumed_from, 1);
    assert_eq!(report.processed, 1);
    let outcomes = fx.ledger("output.json");
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0]["index"], 2);
    assert_eq!(fx.read("state.json"), json!({"lastIndex": 2}));
}

#[tokio::test]
async fn test_replay_after_crash_before_checkpoint() {
    let server = MockServer::start().await;
    serve_pdf(&server, "/p1.pdf", b"%PDF 1").await;
    serve_pdf(&server, "/p2.pdf", b"%PDF 2").await;

    let fx = Fixture::new();
    std::fs::create_dir_all(fx.out()).unwrap();
    // Record 1 was appended but the checkpoint never moved past it
    std::fs::write(
        fx.out().join("output.json"),
        serde_json::to_vec(&json!([
            {"index": 1, "partNumber": "P1", "datasheetUrl": format!("{}P1.pdf", MIRROR)}
        ]))
        .unwrap(),
    )
    .unwrap();

    let records = fx.write_records(json!([
        {"ManufacturerProductNumber": "P1", "DatasheetUrl": format!("{}/p1.pdf", server.uri())},
        {"ManufacturerProductNumber": "P2", "DatasheetUrl": format!("{}/p2.pdf", server.uri())},
    ]));

    let report = run_pipeline(fx.config(&records, "")).await.unwrap();

    assert_eq!(report.skipped_duplicates, 1);
    let outcomes = fx.ledger("output.json");
    let indices: Vec<u64> = outcomes.iter().map(|e| e["index"].as_u64().unwrap()).collect();
    assert_eq!(indices, vec![1, 2]);
    assert_eq!(fx.read("state.json"), json!({"lastIndex": 2}));
}

#[tokio::test]
async fn test_replay_does_not_refetch_recorded_index() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;

    let fx = Fixture::new();
    std::fs::create_dir_all(fx.out()).unwrap();
    // Mirrored before a crash that lost state.json
    std::fs::write(
        fx.out().join("output.json"),
        serde_json::to_vec(&json!([
            {"index": 1, "partNumber": "P1", "datasheetUrl": format!("{}P1.pdf", MIRROR)}
        ]))
        .unwrap(),
    )
    .unwrap();

    let records = fx.write_records(json!([
        {"ManufacturerProductNumber": "P1", "DatasheetUrl": format!("{}/p1.pdf", server.uri())},
    ]));

    let report = run_pipeline(fx.config(&records, "")).await.unwrap();

    assert_eq!(report.skipped_duplicates, 1);
    assert_eq!(report.exhausted, 0);
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(!fx.out().join("failed.json").exists());
    assert_eq!(fx.ledger("output.json").len(), 1);
    assert_eq!(fx.read("state.json"), json!({"lastIndex": 1}));
}

#[tokio::test]
async fn test_trusted_host_passthrough() {
    let server = MockServer::start().await;

    let fx = Fixture::new();
    let url = format!("{}/trusted/sheet.pdf", server.uri());
    let records = fx.write_records(json!([
        {"ManufacturerProductNumber": "T1", "DatasheetUrl": url}
    ]));

    let report = run_pipeline(fx.config(&records, r#"trusted-hosts = ["127.0.0.1"]"#))
        .await
        .unwrap();

    assert_eq!(report.trusted, 1);
    assert_eq!(
        fx.ledger("output.json"),
        vec![json!({"index": 1, "partNumber": "T1", "datasheetUrl": url})]
    );
    assert!(!fx.out().join("T1.pdf").exists());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_redirect_parameter_followed() {
    let server = MockServer::start().await;
    serve_pdf(&server, "/files/x.pdf", b"%PDF x").await;

    let inner = format!("{}/files/x.pdf", server.uri());
    let encoded: String = url::form_urlencoded::byte_serialize(inner.as_bytes()).collect();

    let fx = Fixture::new();
    let records = fx.write_records(json!([
        {"ManufacturerProductNumber": "X", "DatasheetUrl": format!("{}/view?gotoUrl={}", server.uri(), encoded)}
    ]));

    let report = run_pipeline(fx.config(&records, "")).await.unwrap();

    assert_eq!(report.mirrored, 1);
    assert_eq!(std::fs::read(fx.out().join("X.pdf")).unwrap(), b"%PDF x");
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), "/files/x.pdf");
}

#[tokio::test]
async fn test_malformed_records_keep_positions() {
    let server = MockServer::start().await;
    serve_pdf(&server, "/c.pdf", b"%PDF c").await;

    let fx = Fixture::new();
    let records = fx.write_records(json!([
        42,
        {"ManufacturerProductNumber": ["not", "a", "string"], "DatasheetUrl": format!("{}/c.pdf", server.uri())},
    ]));

    let report = run_pipeline(fx.config(&records, "")).await.unwrap();

    assert_eq!(report.unresolvable, 1);
    assert_eq!(report.mirrored, 1);
    let outcomes = fx.ledger("output.json");
    assert_eq!(outcomes[1]["partNumber"], "UnknownPart_2");
    assert!(fx.out().join("UnknownPart_2.pdf").exists());
}

#[tokio::test]
async fn test_fresh_reset_refetches() {
    let server = MockServer::start().await;
    serve_pdf(&server, "/a.pdf", b"%PDF a").await;

    let fx = Fixture::new();
    let records = fx.write_records(json!([
        {"ManufacturerProductNumber": "A", "DatasheetUrl": format!("{}/a.pdf", server.uri())}
    ]));
    let config = fx.config(&records, "");

    run_pipeline(config.clone()).await.unwrap();
    RunJournal::reset(&fx.out()).unwrap();
    let report = run_pipeline(config).await.unwrap();

    assert_eq!(report.resumed_from, 0);
    assert_eq!(report.mirrored, 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_missing_input_path_is_config_error() {
    let fx = Fixture::new();
    let mut config = fx.config(Path::new("unused.json"), "");
    config.input.path = None;

    let result = run_pipeline(config).await;
    assert!(matches!(result, Err(MirrorError::Config(_))));
}

#[tokio::test]
async fn test_unreadable_input_is_records_error() {
    let fx = Fixture::new();
    let config = fx.config(&fx.dir.path().join("absent.json"), "");

    let result = run_pipeline(config).await;
    assert!(matches!(result, Err(MirrorError::Records(_))));
}
