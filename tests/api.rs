//! HTTP API tests.
//! Spins up the REST server on a random port over a tempdir data directory
//! and drives it with raw HTTP/1.1 requests.

use std::sync::Arc;
use tagboard::{config::DaemonConfig, hardware::NullSink, rest, AppContext};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const TOKEN: &str = "test-token";

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Find a free local port by binding to port 0.
fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Boot the server over `dir` on a random port; returns the port.
async fn start_server(dir: &TempDir, auth_token: Option<&str>) -> u16 {
    let port = find_free_port();
    let mut config = DaemonConfig::new(
        Some(port),
        Some(dir.path().to_path_buf()),
        Some("error".to_string()),
        Some("127.0.0.1".to_string()),
        auth_token.map(str::to_string),
    );
    config.hardware.enabled = false;

    let ctx = Arc::new(AppContext::new(Arc::new(config), Arc::new(NullSink)));
    tokio::spawn(async move {
        let _ = rest::start_rest_server(ctx).await;
    });

    // Give the listener a moment to come up.
    for _ in 0..50 {
        if TcpStream::connect(format!("127.0.0.1:{port}")).await.is_ok() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    port
}

/// Send one HTTP/1.1 request and return (status code, parsed JSON body).
async fn request(
    port: u16,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<&str>,
) -> (u16, serde_json::Value) {
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n");
    if let Some(token) = token {
        req.push_str(&format!("Authorization: Bearer {token}\r\n"));
    }
    match body {
        Some(body) => {
            req.push_str(&format!(
                "Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
                body.len()
            ));
        }
        None => req.push_str("\r\n"),
    }

    let mut stream = TcpStream::connect(format!("127.0.0.1:{port}"))
        .await
        .unwrap();
    stream.write_all(req.as_bytes()).await.unwrap();

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    let response = String::from_utf8_lossy(&buf).to_string();

    let status: u16 = response
        .split_whitespace()
        .nth(1)
        .expect("no status line")
        .parse()
        .unwrap();
    let body_start = response
        .find("\r\n\r\n")
        .map(|i| i + 4)
        .expect("no body in response");
    let json = serde_json::from_str(&response[body_start..])
        .unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn scan(port: u16, body: &str) -> (u16, serde_json::Value) {
    request(port, "POST", "/api/nfc/scan", Some(TOKEN), Some(body)).await
}

// ─── Auth ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn bad_token_is_rejected_but_health_stays_open() {
    let dir = TempDir::new().unwrap();
    let port = start_server(&dir, Some(TOKEN)).await;

    let (status, body) = request(port, "GET", "/api/tasks", Some("wrong"), None).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = request(port, "GET", "/api/tasks", None, None).await;
    assert_eq!(status, 401);

    let (status, body) = request(port, "GET", "/api/health", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["hardware_enabled"], false);
}

#[tokio::test]
async fn unset_token_disables_auth() {
    let dir = TempDir::new().unwrap();
    let port = start_server(&dir, None).await;

    let (status, _) = request(port, "GET", "/api/tasks", None, None).await;
    assert_eq!(status, 200);
}

// ─── Scan flow ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn scan_cycle_runs_zero_one_two_zero() {
    let dir = TempDir::new().unwrap();
    let port = start_server(&dir, Some(TOKEN)).await;

    // First scan creates the task at status 0.
    let (status, body) = scan(port, r#"{"tag_id":"T1","task_title":"Water Plants"}"#).await;
    assert_eq!(status, 201);
    assert_eq!(body["status"], "task_created_and_mapped");
    assert_eq!(body["new_status"], 0);
    assert_eq!(body["status_name"], "Not Started");

    // Three more scans walk the cycle.
    for expected in [1, 2, 0] {
        let (status, body) = scan(port, r#"{"tag_id":"T1"}"#).await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "task_incremented");
        assert_eq!(body["new_status"], expected);
    }
}

#[tokio::test]
async fn unmapped_tag_without_title_fails_and_mutates_nothing() {
    let dir = TempDir::new().unwrap();
    let port = start_server(&dir, Some(TOKEN)).await;

    let (status, body) = scan(port, r#"{"tag_id":"ghost"}"#).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "unmapped_tag");

    let (_, tasks) = request(port, "GET", "/api/tasks", Some(TOKEN), None).await;
    assert_eq!(tasks["total_count"], 0);
    let (_, pings) = request(port, "GET", "/api/nfc/pings", Some(TOKEN), None).await;
    assert_eq!(pings["count"], 0);
}

#[tokio::test]
async fn scan_creates_exactly_one_task_and_one_mapping() {
    let dir = TempDir::new().unwrap();
    let port = start_server(&dir, Some(TOKEN)).await;

    scan(port, r#"{"tag_id":"T1","task_title":"Feed Cat"}"#).await;
    scan(port, r#"{"tag_id":"T1","task_title":"Feed Cat"}"#).await;

    let (_, tasks) = request(port, "GET", "/api/tasks", Some(TOKEN), None).await;
    assert_eq!(tasks["total_count"], 1);
    let (_, mappings) = request(port, "GET", "/api/nfc/mappings", Some(TOKEN), None).await;
    assert_eq!(mappings["mappings"]["T1"], "Feed Cat");
    assert_eq!(mappings["mappings"].as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn deleted_task_is_recreated_by_the_next_scan() {
    let dir = TempDir::new().unwrap();
    let port = start_server(&dir, Some(TOKEN)).await;

    scan(port, r#"{"tag_id":"T1","task_title":"Water Plants"}"#).await;
    scan(port, r#"{"tag_id":"T1"}"#).await; // status 1

    let (status, _) = request(port, "DELETE", "/api/tasks/1", Some(TOKEN), None).await;
    assert_eq!(status, 200);

    let (status, body) = scan(port, r#"{"tag_id":"T1"}"#).await;
    assert_eq!(status, 201);
    assert_eq!(body["status"], "task_created_remapped");
    assert_eq!(body["new_status"], 0);
    assert_eq!(body["task_title"], "Water Plants");
}

#[tokio::test]
async fn scan_without_tag_id_is_a_bad_request() {
    let dir = TempDir::new().unwrap();
    let port = start_server(&dir, Some(TOKEN)).await;

    let (status, body) = scan(port, r#"{"task_title":"No Tag"}"#).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "bad_request");
}

// ─── Task CRUD ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn task_crud_round_trip() {
    let dir = TempDir::new().unwrap();
    let port = start_server(&dir, Some(TOKEN)).await;

    let (status, body) = request(
        port,
        "POST",
        "/api/tasks",
        Some(TOKEN),
        Some(r#"{"title":"Laundry","priority":7,"effort":3,"due_date":"2026-12-31"}"#),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(body["task_index"], 1);

    let (status, body) = request(port, "GET", "/api/tasks/1", Some(TOKEN), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["task"]["title"], "Laundry");
    assert_eq!(body["task"]["status"], 0);
    assert_eq!(body["task"]["priority"], 7);

    // Empty body cycles; explicit body sets.
    let (_, body) = request(port, "PUT", "/api/tasks/1/status", Some(TOKEN), None).await;
    assert_eq!(body["new_status"], 1);
    let (_, body) = request(
        port,
        "PUT",
        "/api/tasks/1/status",
        Some(TOKEN),
        Some(r#"{"status":2}"#),
    )
    .await;
    assert_eq!(body["new_status"], 2);
    assert_eq!(body["status_name"], "Completed");

    let (status, _) = request(port, "DELETE", "/api/tasks/1", Some(TOKEN), None).await;
    assert_eq!(status, 200);
    let (status, body) = request(port, "GET", "/api/tasks/1", Some(TOKEN), None).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "task_not_found");
}

#[tokio::test]
async fn status_filter_narrows_the_task_list() {
    let dir = TempDir::new().unwrap();
    let port = start_server(&dir, Some(TOKEN)).await;

    for title in ["a", "b"] {
        request(
            port,
            "POST",
            "/api/tasks",
            Some(TOKEN),
            Some(&format!(r#"{{"title":"{title}"}}"#)),
        )
        .await;
    }
    request(port, "PUT", "/api/tasks/1/status", Some(TOKEN), None).await;

    let (_, body) = request(port, "GET", "/api/tasks?status=1", Some(TOKEN), None).await;
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["filtered_count"], 1);
    assert_eq!(body["tasks"][0]["title"], "a");

    let (status, body) = request(port, "GET", "/api/tasks?status=9", Some(TOKEN), None).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn sort_reorders_and_renumbers() {
    let dir = TempDir::new().unwrap();
    let port = start_server(&dir, Some(TOKEN)).await;

    request(
        port,
        "POST",
        "/api/tasks",
        Some(TOKEN),
        Some(r#"{"title":"minor","priority":1}"#),
    )
    .await;
    request(
        port,
        "POST",
        "/api/tasks",
        Some(TOKEN),
        Some(r#"{"title":"urgent","priority":9}"#),
    )
    .await;

    let (status, _) = request(
        port,
        "POST",
        "/api/tasks/sort",
        Some(TOKEN),
        Some(r#"{"sort_by":"priority"}"#),
    )
    .await;
    assert_eq!(status, 200);

    let (_, body) = request(port, "GET", "/api/tasks", Some(TOKEN), None).await;
    assert_eq!(body["tasks"][0]["title"], "urgent");
    assert_eq!(body["tasks"][0]["id"], 1);

    let (status, body) = request(
        port,
        "POST",
        "/api/tasks/sort",
        Some(TOKEN),
        Some(r#"{"sort_by":"favorite_color"}"#),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "bad_request");
}

// ─── Mappings & pings ─────────────────────────────────────────────────────────

#[tokio::test]
async fn mapping_endpoints_manage_tags_without_cycling() {
    let dir = TempDir::new().unwrap();
    let port = start_server(&dir, Some(TOKEN)).await;

    let (status, body) = request(
        port,
        "POST",
        "/api/nfc/mappings",
        Some(TOKEN),
        Some(r#"{"tag_id":"T1","task_title":"Dishes"}"#),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(body["status"], "mapping_created");

    // The backing task exists at status 0 — mapping never cycles.
    let (_, task) = request(port, "GET", "/api/tasks/1", Some(TOKEN), None).await;
    assert_eq!(task["task"]["status"], 0);

    let (status, _) = request(port, "DELETE", "/api/nfc/mappings/T1", Some(TOKEN), None).await;
    assert_eq!(status, 200);
    let (status, body) =
        request(port, "DELETE", "/api/nfc/mappings/T1", Some(TOKEN), None).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "mapping_not_found");
}

#[tokio::test]
async fn pings_honor_the_limit_parameter() {
    let dir = TempDir::new().unwrap();
    let port = start_server(&dir, Some(TOKEN)).await;

    scan(port, r#"{"tag_id":"T1","task_title":"Water Plants"}"#).await;
    for _ in 0..3 {
        scan(port, r#"{"tag_id":"T1"}"#).await;
    }

    let (_, body) = request(port, "GET", "/api/nfc/pings?limit=2", Some(TOKEN), None).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["pings"][1]["action"], "task_incremented");
    assert_eq!(body["pings"][1]["reader"], "api");

    let (_, body) = request(port, "GET", "/api/nfc/stats", Some(TOKEN), None).await;
    assert_eq!(body["stats"]["total_mappings"], 1);
    assert_eq!(body["stats"]["most_used_tag"]["tag_id"], "T1");
}

// ─── nfc_public ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn nfc_public_opens_only_the_nfc_family() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path()).unwrap();
    std::fs::write(dir.path().join("config.toml"), "nfc_public = true\n").unwrap();
    let port = start_server(&dir, Some(TOKEN)).await;

    // Scan without any token succeeds...
    let (status, _) = request(
        port,
        "POST",
        "/api/nfc/scan",
        None,
        Some(r#"{"tag_id":"T1","task_title":"Open Scan"}"#),
    )
    .await;
    assert_eq!(status, 201);

    // ...but the task endpoints still demand the token.
    let (status, _) = request(port, "GET", "/api/tasks", None, None).await;
    assert_eq!(status, 401);
}
