//! CLI options interaction tests
//!
//! These tests run the `mct` binary to validate argument handling, error
//! reporting and end-to-end runs against a mock provider.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

const PROVIDER_VARS: [&str; 8] = [
    "PROVIDER_ENGINE",
    "PROVIDER_BASE_URL",
    "PROVIDER_API_KEY",
    "PROVIDER_MODELS",
    "MODEL_REDIRECTS",
    "TEST_CONCURRENCY",
    "PROBE_TIMEOUT_SECONDS",
    "ENABLE_COLOR",
];

/// Helper function to create a test command isolated from the caller's
/// environment and `.env` file
fn create_test_cmd(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mct").unwrap();
    for var in PROVIDER_VARS {
        cmd.env_remove(var);
    }
    cmd.current_dir(workdir.path());
    cmd
}

fn workdir() -> TempDir {
    TempDir::new().unwrap()
}

/// Mock OpenAI-compatible provider: `gpt-4o` answers, `ghost` is unknown
async fn mock_provider() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({ "model": "gpt-4o" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "hi" } }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({ "model": "ghost" })))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": { "message": "model not found" }
        })))
        .mount(&server)
        .await;

    server
}

/// Run the binary off the async runtime so the mock server keeps serving
async fn run_blocking(mut cmd: Command) -> Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

fn entry<'a>(report: &'a Value, name: &str) -> &'a Value {
    report["entries"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["display_name"] == name)
        .unwrap()
}

#[test]
fn test_help_lists_options() {
    let dir = workdir();
    create_test_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--base-url"))
        .stdout(predicate::str::contains("--concurrency"))
        .stdout(predicate::str::contains("--only"));
}

#[test]
fn test_env_help() {
    let dir = workdir();
    create_test_cmd(&dir)
        .arg("--env-help")
        .assert()
        .success()
        .stdout(predicate::str::contains("PROVIDER_BASE_URL"))
        .stdout(predicate::str::contains("TEST_CONCURRENCY"))
        .stdout(predicate::str::contains("Configuration Priority"));
}

#[test]
fn test_missing_base_url_is_config_error() {
    let dir = workdir();
    create_test_cmd(&dir)
        .args(["--model", "gpt-4o", "--no-color"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"))
        .stderr(predicate::str::contains("base URL is required"));
}

#[test]
fn test_missing_models_is_config_error() {
    let dir = workdir();
    create_test_cmd(&dir)
        .args(["--base-url", "https://api.example.com", "--no-color"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("At least one model is required"));
}

#[test]
fn test_color_flags_conflict() {
    let dir = workdir();
    create_test_cmd(&dir)
        .args(["--base-url", "https://api.example.com", "--model", "gpt-4o"])
        .args(["--color", "--no-color"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Cannot specify both --color and --no-color"));
}

#[test]
fn test_json_conflicts_with_verbose() {
    let dir = workdir();
    create_test_cmd(&dir)
        .args(["--base-url", "https://api.example.com", "--model", "gpt-4o"])
        .args(["--json", "--verbose", "--no-color"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("--json cannot be combined with --verbose"));
}

#[test]
fn test_invalid_engine_rejected_by_parser() {
    let dir = workdir();
    create_test_cmd(&dir)
        .args(["--engine", "cohere", "--base-url", "https://api.example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cohere"));
}

#[test]
fn test_timeout_bounds() {
    for timeout in ["0", "301", "abc"] {
        let dir = workdir();
        create_test_cmd(&dir)
            .args(["--base-url", "https://api.example.com", "--model", "gpt-4o"])
            .args(["--timeout", timeout])
            .assert()
            .failure();
    }
}

#[test]
fn test_invalid_env_file_value() {
    let dir = workdir();
    fs::write(
        dir.path().join(".env"),
        "PROVIDER_BASE_URL=https://api.example.com\nPROVIDER_MODELS=gpt-4o\nTEST_CONCURRENCY=lots\n",
    )
    .unwrap();

    create_test_cmd(&dir)
        .arg("--no-color")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid TEST_CONCURRENCY value 'lots'"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_json_run_against_mock_provider() {
    let server = mock_provider().await;
    let dir = workdir();

    let mut cmd = create_test_cmd(&dir);
    cmd.args(["--base-url", &server.uri(), "--api-key", "sk-test"])
        .args(["--model", "gpt-4o", "--model", "ghost"])
        .args(["--concurrency", "2", "--json", "--no-color"]);
    let output = run_blocking(cmd).await;

    // Per-model failures are results, not a failed run.
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(report["engine"], "openai");
    assert_eq!(report["counts"]["success"], 1);
    assert_eq!(report["counts"]["error"], 1);
    assert_eq!(report["counts"]["pending"], 0);
    assert!(report.get("api_key").is_none());

    let ok = entry(&report, "gpt-4o");
    assert_eq!(ok["status"], "success");
    assert!(ok["latency_ms"].is_u64());

    let missing = entry(&report, "ghost");
    assert_eq!(missing["status"], "error");
    let message = missing["error_message"].as_str().unwrap();
    assert!(message.contains("HTTP 404"));
    assert!(message.contains("model not found"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_env_file_configures_run() {
    let server = mock_provider().await;
    let dir = workdir();
    fs::write(
        dir.path().join(".env"),
        format!(
            "PROVIDER_ENGINE=openai\nPROVIDER_BASE_URL={}\nPROVIDER_MODELS=fast,ghost\nMODEL_REDIRECTS=fast=gpt-4o\n",
            server.uri()
        ),
    )
    .unwrap();

    let mut cmd = create_test_cmd(&dir);
    cmd.args(["--json", "--no-color"]);
    let output = run_blocking(cmd).await;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    let fast = entry(&report, "fast");
    assert_eq!(fast["upstream_name"], "gpt-4o");
    assert_eq!(fast["status"], "success");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_only_probes_single_model() {
    let server = mock_provider().await;
    let dir = workdir();

    let mut cmd = create_test_cmd(&dir);
    cmd.args(["--base-url", &server.uri()])
        .args(["--model", "gpt-4o", "--model", "ghost"])
        .args(["--only", "gpt-4o", "--json", "--no-color"]);
    let output = run_blocking(cmd).await;

    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["counts"]["success"], 1);
    assert_eq!(report["counts"]["pending"], 1);
    assert_eq!(entry(&report, "ghost")["status"], "pending");
}

#[test]
fn test_only_unknown_model_fails() {
    let dir = workdir();
    create_test_cmd(&dir)
        .args(["--base-url", "http://127.0.0.1:9", "--model", "gpt-4o"])
        .args(["--only", "claude", "--no-color"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Not found"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_table_output_and_filter() {
    let server = mock_provider().await;
    let dir = workdir();

    let mut cmd = create_test_cmd(&dir);
    cmd.args(["--base-url", &server.uri()])
        .args(["--models", "gpt-4o,ghost", "--filter", "GPT", "--no-color"]);
    let output = run_blocking(cmd).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Model Connectivity:"));
    assert!(stdout.contains("[success] gpt-4o"));
    assert!(stdout.contains("[  error] ghost"));
}
