use assert_cmd::prelude::*;
use mockito::Matcher;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

fn write_config(dir: &Path, endpoints: &[&str]) -> PathBuf {
    let path = dir.join("config.yaml");
    let mut contents = String::from("endpoints:\n");
    for endpoint in endpoints {
        contents.push_str(&format!("  - {endpoint}\n"));
    }
    contents.push_str("api_token: test-token\npreferences:\n  page_size: 20\n  retries: 1\n");
    fs::write(&path, contents).expect("failed to write config");
    path
}

/// Binary isolated from the developer's home, config and store
fn pulsakit(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pulsakit"));
    cmd.env("HOME", dir)
        .env("PULSAKIT_CACHE_DIR", dir.join("cache"))
        .env_remove("PULSAKIT_CONFIG")
        .env_remove("PULSAKIT_ENDPOINTS")
        .env_remove("PULSAKIT_API_TOKEN")
        .env_remove("PULSAKIT_FORMAT")
        .env_remove("PULSAKIT_NO_CACHE");
    cmd
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn status_uses_custom_config_path() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &["https://primary.example.test"]);

    let assert = pulsakit(temp.path())
        .arg("status")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(stdout.contains("https://primary.example.test"));
    assert!(stdout.contains("API token configured"));
    assert!(stdout.contains(&config_path.to_string_lossy().to_string()));

    Ok(())
}

#[test]
fn status_without_config_suggests_init() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    let assert = pulsakit(temp.path()).arg("status").assert().success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(stdout.contains("Configuration not found"));
    assert!(stdout.contains("pulsakit init"));

    Ok(())
}

#[test]
fn member_list_without_endpoints_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    pulsakit(temp.path())
        .args(["member", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No backend endpoints configured"));

    Ok(())
}

#[test]
fn guard_locks_after_five_failures_and_resets() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    for _ in 0..4 {
        let output = pulsakit(temp.path())
            .args(["--format", "json", "guard", "fail", "admin-login"])
            .output()?;
        assert!(output.status.success());
        assert_eq!(stdout_json(&output)["data"]["state"], "open");
    }

    let output = pulsakit(temp.path())
        .args(["--format", "json", "guard", "fail", "admin-login"])
        .output()?;
    let json = stdout_json(&output);
    assert_eq!(json["data"]["state"], "locked");
    assert_eq!(json["data"]["attempts"], 5);
    let remaining = json["data"]["remaining_ms"].as_u64().unwrap_or(0);
    assert!(remaining > 890_000 && remaining <= 900_000);

    // Lock persists across invocations
    let output = pulsakit(temp.path())
        .args(["--format", "json", "guard", "check", "admin-login"])
        .output()?;
    assert_eq!(stdout_json(&output)["data"]["state"], "locked");

    // Other scopes are unaffected
    let output = pulsakit(temp.path())
        .args(["--format", "json", "guard", "check", "reseller-login"])
        .output()?;
    assert_eq!(stdout_json(&output)["data"]["state"], "open");

    pulsakit(temp.path())
        .args(["guard", "reset", "admin-login"])
        .assert()
        .success();

    let output = pulsakit(temp.path())
        .args(["--format", "json", "guard", "check", "admin-login"])
        .output()?;
    let json = stdout_json(&output);
    assert_eq!(json["data"]["state"], "open");
    assert_eq!(json["data"]["attempts"], 0);

    Ok(())
}

#[test]
fn guard_lock_survives_failures_and_cache_clear() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    for _ in 0..5 {
        pulsakit(temp.path())
            .args(["guard", "fail", "admin-login"])
            .assert()
            .success();
    }

    let output = pulsakit(temp.path())
        .args(["--format", "json", "guard", "fail", "admin-login"])
        .output()?;
    let json = stdout_json(&output);
    assert_eq!(json["data"]["state"], "locked");
    assert_eq!(json["data"]["attempts"], 6);

    let output = pulsakit(temp.path())
        .args(["--format", "json", "cache", "clear"])
        .output()?;
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["member_lists_removed"], 0);

    let output = pulsakit(temp.path())
        .args(["--format", "json", "guard", "check", "admin-login"])
        .output()?;
    assert_eq!(stdout_json(&output)["data"]["state"], "locked");

    Ok(())
}

#[test]
fn cache_path_honors_cache_dir_override() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    let assert = pulsakit(temp.path())
        .args(["cache", "path"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    let expected = temp.path().join("cache").join("store.db");
    assert_eq!(stdout.trim(), expected.to_string_lossy());

    Ok(())
}

#[test]
fn completion_generates_script() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    pulsakit(temp.path())
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pulsakit"));

    Ok(())
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[test]
fn endpoint_skips_unhealthy_candidate() -> Result<(), Box<dyn std::error::Error>> {
    let mut down = mockito::Server::new();
    let mut up = mockito::Server::new();

    let _down_health = down.mock("GET", "/health").with_status(503).create();
    let _up_health = up.mock("GET", "/health").with_status(200).create();

    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &[&down.url(), &up.url()]);

    let output = pulsakit(temp.path())
        .args(["--format", "json", "endpoint", "--config"])
        .arg(&config_path)
        .output()?;

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["endpoint"], up.url());
    assert_eq!(json["fallback"], false);
    assert_eq!(json["probe_sequences"], 1);

    Ok(())
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[test]
fn endpoint_falls_back_to_first_candidate() -> Result<(), Box<dyn std::error::Error>> {
    let mut first = mockito::Server::new();
    let mut second = mockito::Server::new();

    let _first_health = first.mock("GET", "/health").with_status(500).create();
    let _second_health = second.mock("GET", "/health").with_status(500).create();

    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &[&first.url(), &second.url()]);

    let output = pulsakit(temp.path())
        .args(["--format", "json", "endpoint", "--config"])
        .arg(&config_path)
        .output()?;

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["endpoint"], first.url());
    assert_eq!(json["fallback"], true);

    Ok(())
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[test]
fn member_list_serves_second_run_from_cache() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let _health = server.mock("GET", "/health").with_status(200).create();
    let members = server
        .mock("GET", "/members")
        .match_query(Matcher::UrlEncoded("search".into(), "budi".into()))
        .match_header("authorization", "test-token")
        .with_status(200)
        .with_body(
            r#"{
                "data": [{ "kode": "M001", "nama": "Budi" }],
                "total": 1,
                "hasMore": false,
                "nextCursor": null
            }"#,
        )
        .expect(1)
        .create();

    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &[&server.url()]);

    let first = pulsakit(temp.path())
        .args(["--format", "json", "member", "list", "--search", "budi", "--config"])
        .arg(&config_path)
        .output()?;
    assert!(first.status.success());
    let json = stdout_json(&first);
    assert_eq!(json["data"][0]["kode"], "M001");
    assert_eq!(json["meta"]["pagination"]["cached"], false);

    // Same filters after trimming: served from the store without a request
    let second = pulsakit(temp.path())
        .args(["--format", "json", "member", "list", "--search", "  budi ", "--config"])
        .arg(&config_path)
        .output()?;
    assert!(second.status.success());
    let json = stdout_json(&second);
    assert_eq!(json["data"][0]["kode"], "M001");
    assert_eq!(json["meta"]["pagination"]["cached"], true);

    members.assert();
    Ok(())
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[test]
fn member_list_more_appends_next_page() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let _health = server.mock("GET", "/health").with_status(200).create();
    let _first_page = server
        .mock("GET", "/members")
        .match_query(Matcher::Regex("^limit=2$".into()))
        .with_status(200)
        .with_body(
            r#"{
                "data": [{ "kode": "A" }, { "kode": "B" }],
                "total": 3,
                "hasMore": true,
                "nextCursor": "c2"
            }"#,
        )
        .create();
    let _second_page = server
        .mock("GET", "/members")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("limit".into(), "2".into()),
            Matcher::UrlEncoded("cursor".into(), "c2".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{
                "data": [{ "kode": "B", "nama": "Updated" }, { "kode": "C" }],
                "total": 3,
                "hasMore": false,
                "nextCursor": null
            }"#,
        )
        .create();

    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &[&server.url()]);

    pulsakit(temp.path())
        .args(["--format", "json", "member", "list", "--limit", "2", "--config"])
        .arg(&config_path)
        .assert()
        .success();

    let output = pulsakit(temp.path())
        .args(["--format", "json", "member", "list", "--limit", "2", "--more", "--config"])
        .arg(&config_path)
        .output()?;
    assert!(output.status.success());

    let json = stdout_json(&output);
    let kodes: Vec<&str> = json["data"]
        .as_array()
        .map(|records| records.iter().filter_map(|r| r["kode"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(kodes, vec!["A", "B", "C"]);
    assert_eq!(json["data"][1]["nama"], "Updated");
    assert_eq!(json["meta"]["pagination"]["hasMore"], false);

    Ok(())
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[test]
fn request_retries_server_errors_then_fails() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let _health = server.mock("GET", "/health").with_status(200).create();
    let flaky = server
        .mock("GET", "/reports")
        .with_status(503)
        .with_body(r#"{"message":"maintenance"}"#)
        .expect(2)
        .create();

    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &[&server.url()]);

    let assert = pulsakit(temp.path())
        .args(["request", "/reports", "--retries", "1", "--config"])
        .arg(&config_path)
        .assert()
        .failure();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(stdout.contains("maintenance"));
    flaky.assert();

    Ok(())
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[test]
fn request_sends_headers_and_body() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let _health = server.mock("GET", "/health").with_status(200).create();
    let created = server
        .mock("POST", "/members")
        .match_header("content-type", "application/json")
        .match_header("x-trace", "abc")
        .match_header("authorization", "override")
        .match_body(Matcher::Json(serde_json::json!({ "kode": "M009" })))
        .with_status(201)
        .with_body(r#"{"kode":"M009"}"#)
        .create();

    let temp = tempdir()?;
    let config_path = write_config(temp.path(), &[&server.url()]);

    pulsakit(temp.path())
        .args([
            "request",
            "/members",
            "-X",
            "post",
            "-H",
            "X-Trace: abc",
            "-H",
            "Authorization: override",
            "--data",
            r#"{"kode":"M009"}"#,
            "--config",
        ])
        .arg(&config_path)
        .assert()
        .success();

    created.assert();
    Ok(())
}
