#![deny(clippy::all, clippy::pedantic)]

use assert_cmd::Command;
use httpmock::MockServer;
use predicates::prelude::*;
use predicates::str::contains;
use std::io::Write;
use tempfile::NamedTempFile;

fn secret_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("tmp file");
    file.write_all(contents.as_bytes()).expect("write secret");
    file
}

#[test]
fn revalidate_works_end_to_end() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/revalidate")
            .header("x-revalidate-secret", "cli-secret");
        then.status(200)
            .header("content-type", "application/json")
            .body(
                r#"{"revalidated":true,"tags":["places","sitemap"],
                    "edge":{"purged":false,"skipped":true,"prefixes":0},
                    "cdn":{"invalidated":false,"skipped":true,"paths":0,"truncated":false},
                    "warnings":[],"timestamp":"2026-01-01T00:00:00Z"}"#,
            );
    });

    let secret = secret_file("cli-secret\n");
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("freshline_cli"));
    let assert = cmd
        .env("FRESHLINE_SITE_URL", server.base_url())
        .env("FRESHLINE_SECRET_FILE", secret.path())
        .env_remove("FRESHLINE_SECRET")
        .arg("revalidate")
        .arg("places")
        .arg("sitemap")
        .assert()
        .success();

    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("\"revalidated\": true"));
    mock.assert();
}

#[test]
fn rejected_secret_exits_non_zero() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path("/revalidate");
        then.status(401)
            .header("content-type", "application/json")
            .body(r#"{"error":"Unauthorized"}"#);
    });

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("freshline_cli"));
    cmd.env("FRESHLINE_SITE_URL", server.base_url())
        .env("FRESHLINE_SECRET", "wrong")
        .env_remove("FRESHLINE_SECRET_FILE")
        .arg("revalidate")
        .arg("places")
        .assert()
        .failure()
        .stderr(contains("Unauthorized"));
}

#[test]
fn missing_site_fails_fast() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("freshline_cli"));
    cmd.arg("revalidate")
        .arg("places")
        .env_remove("FRESHLINE_SITE_URL")
        .env_remove("FRESHLINE_SECRET")
        .env_remove("FRESHLINE_SECRET_FILE")
        .assert()
        .failure()
        .stderr(contains("MissingSite"));
}

#[test]
fn tags_lists_the_allowed_set_without_a_site() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("freshline_cli"));
    cmd.arg("tags")
        .env_remove("FRESHLINE_SITE_URL")
        .assert()
        .success()
        .stdout(contains("places"))
        .stdout(contains("collections"))
        .stdout(contains("sitemap"));
}

#[test]
fn server_check_config_redacts_secrets() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("freshline"));
    cmd.arg("check-config")
        .env("FRESHLINE__REVALIDATE__SECRET", "super-secret-value")
        .env("FRESHLINE__EDGE__API_TOKEN", "edge-token-value")
        .env("FRESHLINE__EDGE__ZONE_ID", "zone-1")
        .assert()
        .success()
        .stdout(contains("Secret(***)"))
        .stdout(contains("edge: configured"))
        .stdout(contains("cdn: skipped"))
        .stdout(contains("super-secret-value").not());
}
