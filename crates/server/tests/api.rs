//! Operator API tests against the in-process router.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{fixtures, TestFixture, TEST_API_KEY};

/// Poll the run lock until the spawned run has finished.
async fn wait_for_idle(fixture: &TestFixture) {
    for _ in 0..500 {
        if !fixture.scheduler.is_run_in_progress() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("harvest run did not finish in time");
}

#[tokio::test]
async fn test_health_is_open_even_with_auth() {
    let fixture = TestFixture::with_api_key().await;

    let response = fixture.get_with_key("/api/v1/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_protected_routes_require_key() {
    let fixture = TestFixture::with_api_key().await;

    let missing = fixture.get_with_key("/api/v1/status", None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let wrong = fixture.get_with_key("/api/v1/status", Some("nope")).await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let bearer = fixture
        .get_with_key("/api/v1/status", Some(TEST_API_KEY))
        .await;
    assert_eq!(bearer.status, StatusCode::OK);

    let header = fixture
        .get_with_header_key("/api/v1/status", TEST_API_KEY)
        .await;
    assert_eq!(header.status, StatusCode::OK);
}

#[tokio::test]
async fn test_config_hides_secrets() {
    let fixture = TestFixture::with_api_key().await;

    let response = fixture.get("/api/v1/config").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["translator"]["api_key_configured"], true);
    assert_eq!(response.body["auth"]["api_key_configured"], true);
    assert!(!response.text.contains("sk-should-never-leak"));
    assert!(!response.text.contains(TEST_API_KEY));
}

#[tokio::test]
async fn test_status_lists_categories() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/status").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["running"], false);
    assert_eq!(response.body["run_in_progress"], false);
    assert_eq!(response.body["runs_completed"], 0);
    assert_eq!(response.body["frequency_hours"], 24);
    let categories = response.body["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0]["table"], "cs_ai");
}

#[tokio::test]
async fn test_last_run_not_found_before_any_run() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/runs/last").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_start_run_commits_and_reports() {
    let fixture = TestFixture::new().await;
    fixture
        .catalog
        .set_results("cat:cs.AI", fixtures::articles("AI", 2))
        .await;
    fixture
        .catalog
        .set_results("cat:cs.CL", vec![fixtures::article("CL1")])
        .await;

    let response = fixture.post("/api/v1/runs").await;
    assert_eq!(response.status, StatusCode::ACCEPTED);

    wait_for_idle(&fixture).await;

    let last = fixture.get("/api/v1/runs/last").await;
    assert_eq!(last.status, StatusCode::OK);
    let passes = last.body["passes"].as_array().unwrap();
    assert_eq!(passes.len(), 2);
    assert_eq!(passes[0]["committed"], 2);
    assert_eq!(passes[1]["committed"], 1);
    assert_eq!(passes[0]["outcome"]["type"], "committed");

    assert_eq!(fixture.store.entry_ids("cs_ai"), vec!["AI1", "AI2"]);
    assert_eq!(fixture.translator.call_count().await, 6);
}

#[tokio::test]
async fn test_start_run_conflicts_while_running() {
    let fixture = TestFixture::new().await;
    fixture.catalog.set_delay(Duration::from_millis(300)).await;

    let first = fixture.post("/api/v1/runs").await;
    assert_eq!(first.status, StatusCode::ACCEPTED);

    let second = fixture.post("/api/v1/runs").await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert!(second.body["error"]
        .as_str()
        .unwrap()
        .contains("already in progress"));

    let status = fixture.get("/api/v1/status").await;
    assert_eq!(status.body["run_in_progress"], true);

    wait_for_idle(&fixture).await;
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_harvester_metrics() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v1/health").await;

    let response = fixture.get("/metrics").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text.contains("harvester_http_requests_total"));
    assert!(response.text.contains("harvester_scheduler_running"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/articles").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
