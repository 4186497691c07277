//! End-to-end tests against a running server.
//!
//! These tests require:
//! 1. The API server running on the configured address
//! 2. Network access to Nominatim and Overpass (or a warm cache)
//!
//! Run with: cargo test --test e2e_test -- --ignored --nocapture
//!
//! Set API_BASE_URL to override the default (http://localhost:3000)

use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;

fn base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

#[tokio::test]
#[ignore] // Requires a running API server
async fn test_e2e_health_check() {
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/health", base_url()))
        .send()
        .await
        .expect("Health check request failed");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Health body not JSON");
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
#[ignore] // Requires a running API server
async fn test_e2e_theme_listing() {
    let client = reqwest::Client::new();

    let themes: Vec<Value> = client
        .get(format!("{}/api/themes", base_url()))
        .send()
        .await
        .expect("Theme listing request failed")
        .json()
        .await
        .expect("Theme listing not JSON");

    assert!(themes.iter().any(|t| t["id"] == "terracotta"));
}

#[tokio::test]
#[ignore] // Requires a running API server and upstream OSM access
async fn test_e2e_generate_and_poll() {
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/generate", base_url()))
        .json(&json!({
            "lat": 48.8566,
            "lon": 2.3522,
            "theme": "noir",
            "distance": 10000,
            "city": "Paris",
            "country": "France"
        }))
        .send()
        .await
        .expect("Generate request failed");

    assert_eq!(response.status(), 202);
    let body: Value = response.json().await.expect("Generate body not JSON");
    let job_id = body["job_id"].as_str().expect("job_id missing").to_string();

    // Poll until terminal; rendering against live OSM data can take a while.
    for _ in 0..120 {
        let status: Value = client
            .get(format!("{}/api/jobs/{}", base_url(), job_id))
            .send()
            .await
            .expect("Status request failed")
            .json()
            .await
            .expect("Status body not JSON");

        match status["status"].as_str() {
            Some("completed") => {
                let url = status["url"].as_str().expect("completed without url");
                assert!(url.starts_with("/api/posters/"));
                assert!(url.ends_with(".png"));
                return;
            }
            Some("failed") => {
                panic!("Job failed: {}", status["error"]);
            }
            _ => sleep(Duration::from_secs(2)).await,
        }
    }

    panic!("Job did not complete in time");
}

#[tokio::test]
#[ignore] // Requires a running API server
async fn test_e2e_rejects_invalid_input() {
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/generate", base_url()))
        .json(&json!({
            "lat": 123.0,
            "lon": 2.3522,
            "theme": "noir"
        }))
        .send()
        .await
        .expect("Generate request failed");

    assert_eq!(response.status(), 422);
}

#[tokio::test]
#[ignore] // Requires a running API server
async fn test_e2e_unknown_job_is_404() {
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/jobs/{}", base_url(), uuid::Uuid::new_v4()))
        .send()
        .await
        .expect("Status request failed");

    assert_eq!(response.status(), 404);
}
