#![allow(deprecated)]

/// Command-line smoke tests
///
/// These run the real binary. Backend calls go to a `wiremock` server and
/// credentials stay in memory so nothing touches the user's keyring.
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

const MEMORY_CONFIG: &str = "credentials:\n  backend: memory\n";

fn cmdstash() -> Command {
    let mut cmd = Command::cargo_bin("cmdstash").unwrap();
    cmd.env_remove("CMDSTASH_API_URL")
        .env_remove("CMDSTASH_CREDENTIALS_BACKEND")
        .env_remove("CMDSTASH_PASSWORD");
    cmd
}

#[test]
fn test_version_flag() {
    cmdstash().arg("--version").assert().success();
}

#[test]
fn test_help_lists_commands() {
    cmdstash()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("fav"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_temp_dir, config_path) =
        common::temp_config_file("api:\n  timeout_seconds: 0\ncredentials:\n  backend: memory\n");

    cmdstash()
        .arg("--config")
        .arg(config_path)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be greater than 0"));
}

#[test]
fn test_login_rejects_bad_email_locally() {
    let (_temp_dir, config_path) = common::temp_config_file(MEMORY_CONFIG);

    cmdstash()
        .arg("--config")
        .arg(config_path)
        .args(["--api-url", "http://127.0.0.1:9/api/"])
        .args(["login", "--email", "not-an-email", "--password", "Abcdef1!"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid email"));
}

#[test]
fn test_tags_rejects_invalid_tag_locally() {
    let (_temp_dir, config_path) = common::temp_config_file(MEMORY_CONFIG);

    cmdstash()
        .arg("--config")
        .arg(config_path)
        .args(["--api-url", "http://127.0.0.1:9/api/"])
        .args(["tags", "Not-Valid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid tag"));
}

#[test]
fn test_status_without_session() {
    let (_temp_dir, config_path) = common::temp_config_file(MEMORY_CONFIG);

    cmdstash()
        .arg("--config")
        .arg(config_path)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_catalog_prints_matches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/command/search"))
        .and(query_param("command", "gi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "commands": [{"id": 1, "command": "git", "similarity": 0.9}]
        })))
        .mount(&server)
        .await;

    let (_temp_dir, config_path) = common::temp_config_file(MEMORY_CONFIG);
    let api_url = format!("{}/api/", server.uri());

    tokio::task::spawn_blocking(move || {
        cmdstash()
            .arg("--config")
            .arg(config_path)
            .args(["--api-url", &api_url])
            .args(["catalog", "gi"])
            .assert()
            .success()
            .stdout(predicate::str::contains("git"));
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_backend_error_message_reaches_stderr() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/usercommand"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"message": "Forbidden resource"})),
        )
        .mount(&server)
        .await;

    let (_temp_dir, config_path) = common::temp_config_file(MEMORY_CONFIG);
    let api_url = format!("{}/api/", server.uri());

    tokio::task::spawn_blocking(move || {
        cmdstash()
            .arg("--config")
            .arg(config_path)
            .args(["--api-url", &api_url])
            .arg("list")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Forbidden resource"));
    })
    .await
    .unwrap();
}
