//! API integration tests
//!
//! These tests run against a live server seeded with the default
//! admin/admin account. Start one with `cargo run`, then run the tests
//! with `cargo test -- --ignored`.

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Helper to get an authenticated admin token
async fn get_auth_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Helper to create a borrower account and log in as them
async fn get_borrower_token(client: &Client, admin_token: &str) -> String {
    let username = format!("borrower{}", chrono::Utc::now().timestamp_micros());

    let response = client
        .post(format!("{}/users", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({
            "username": username,
            "password": "testpass",
            "role": "user"
        }))
        .send()
        .await
        .expect("Failed to create borrower");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": username,
            "password": "testpass"
        }))
        .send()
        .await
        .expect("Failed to log in as borrower");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Helper to register a fresh piece of equipment, returns (id, code)
async fn create_equipment(client: &Client, admin_token: &str) -> (i64, String) {
    let code = format!("IT-{}", chrono::Utc::now().timestamp_micros());

    let response = client
        .post(format!("{}/equipment", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({
            "code": code,
            "name": "Integration Test Oscilloscope",
            "department": "QA"
        }))
        .send()
        .await
        .expect("Failed to create equipment");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    (body["id"].as_i64().expect("No equipment ID"), code)
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["user"]["username"], "admin");
    assert_eq!(body["user"]["role"], "admin");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_get_current_user() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["username"], "admin");
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/equipment", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_list_equipment() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/equipment", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert!(body["total"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_equipment_status_change() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let (id, _code) = create_equipment(&client, &token).await;

    // Retire the equipment, then bring it back
    let response = client
        .put(format!("{}/equipment/{}/status", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "status": "decommissioning" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "decommissioning");

    // Marking equipment borrowed by hand is not allowed
    let response = client
        .put(format!("{}/equipment/{}/status", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "status": "borrowed" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_admin_cannot_borrow() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let (_id, code) = create_equipment(&client, &token).await;

    let response = client
        .post(format!("{}/borrows", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "equipment_code": code,
            "borrow_time": "2026-01-10T09:00:00Z",
            "expected_return_time": "2026-01-12T09:00:00Z"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_full_lending_cycle() {
    let client = Client::new();
    let admin_token = get_auth_token(&client).await;
    let borrower_token = get_borrower_token(&client, &admin_token).await;
    let (equipment_id, code) = create_equipment(&client, &admin_token).await;

    // Borrower submits a request
    let response = client
        .post(format!("{}/borrows", BASE_URL))
        .header("Authorization", format!("Bearer {}", borrower_token))
        .json(&json!({
            "equipment_code": code,
            "borrow_time": "2026-01-10T09:00:00Z",
            "expected_return_time": "2026-01-12T09:00:00Z",
            "note": "Thermal drift measurements"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    let borrow_id = body["id"].as_i64().expect("No borrow ID");
    assert_eq!(body["status"], "pending");

    // Admin approves, equipment goes on loan
    let response = client
        .post(format!("{}/borrows/{}/decision", BASE_URL, borrow_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({ "decision": "approve" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/equipment/{}", BASE_URL, equipment_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "borrowed");

    // Borrower hands the equipment back
    let response = client
        .post(format!("{}/borrows/{}/return", BASE_URL, borrow_id))
        .header("Authorization", format!("Bearer {}", borrower_token))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    let return_id = body["id"].as_i64().expect("No return ID");

    // Admin approves the return, equipment is available again
    let response = client
        .post(format!("{}/returns/{}/decision", BASE_URL, return_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({ "decision": "approve" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/equipment/{}", BASE_URL, equipment_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "available");

    // Borrower got notified about the approvals
    let response = client
        .get(format!("{}/notifications", BASE_URL))
        .header("Authorization", format!("Bearer {}", borrower_token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["total"].as_i64().unwrap_or(0) >= 2);
}

#[tokio::test]
#[ignore]
async fn test_rejection_requires_reason() {
    let client = Client::new();
    let admin_token = get_auth_token(&client).await;
    let borrower_token = get_borrower_token(&client, &admin_token).await;
    let (_equipment_id, code) = create_equipment(&client, &admin_token).await;

    let response = client
        .post(format!("{}/borrows", BASE_URL))
        .header("Authorization", format!("Bearer {}", borrower_token))
        .json(&json!({
            "equipment_code": code,
            "borrow_time": "2026-01-10T09:00:00Z",
            "expected_return_time": "2026-01-12T09:00:00Z"
        }))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let borrow_id = body["id"].as_i64().expect("No borrow ID");

    // No reason given: rejected with 400, request stays pending
    let response = client
        .post(format!("{}/borrows/{}/decision", BASE_URL, borrow_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({ "decision": "reject" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    let response = client
        .post(format!("{}/borrows/{}/decision", BASE_URL, borrow_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({ "decision": "reject", "reason": "Needed for a course" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "rejected");
}

#[tokio::test]
#[ignore]
async fn test_invalid_borrow_window() {
    let client = Client::new();
    let admin_token = get_auth_token(&client).await;
    let borrower_token = get_borrower_token(&client, &admin_token).await;
    let (_equipment_id, code) = create_equipment(&client, &admin_token).await;

    let response = client
        .post(format!("{}/borrows", BASE_URL))
        .header("Authorization", format!("Bearer {}", borrower_token))
        .json(&json!({
            "equipment_code": code,
            "borrow_time": "2026-01-12T09:00:00Z",
            "expected_return_time": "2026-01-10T09:00:00Z"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_pending_queues_are_admin_only() {
    let client = Client::new();
    let admin_token = get_auth_token(&client).await;
    let borrower_token = get_borrower_token(&client, &admin_token).await;

    let response = client
        .get(format!("{}/borrows/pending", BASE_URL))
        .header("Authorization", format!("Bearer {}", borrower_token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);

    let response = client
        .get(format!("{}/borrows/pending", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.is_array());
}

#[tokio::test]
#[ignore]
async fn test_reconcile_endpoint() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .post(format!("{}/equipment/reconcile", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["corrected"].is_number());
    assert!(body["corrections"].is_array());
}

#[tokio::test]
#[ignore]
async fn test_reports() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    for path in [
        "reports/equipment-status",
        "reports/maintenance-due",
        "reports/overdue",
        "reports/usage",
    ] {
        let response = client
            .get(format!("{}/{}", BASE_URL, path))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success(), "{} failed", path);

        let body: Value = response.json().await.expect("Failed to parse response");
        assert!(body.is_array(), "{} did not return an array", path);
    }
}
