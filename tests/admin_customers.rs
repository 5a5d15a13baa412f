//! The admin review workflow over customer accounts.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;
use pharmahub_api::entities::CustomerStatus;

#[tokio::test]
async fn approval_unlocks_ordering() {
    let app = TestApp::spawn().await;
    let (_, admin_token) = app.seed_admin().await;
    let (customer_id, _) = app.seed_customer(CustomerStatus::Pending).await;

    let (status, body) = app
        .post(
            &format!("/api/v1/admin/customers/{customer_id}/approve"),
            Some(&admin_token),
            json!({}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");
}

#[tokio::test]
async fn rejected_accounts_can_be_approved_later() {
    let app = TestApp::spawn().await;
    let (_, admin_token) = app.seed_admin().await;
    let (customer_id, _) = app.seed_customer(CustomerStatus::Pending).await;
    let base = format!("/api/v1/admin/customers/{customer_id}");

    let (status, body) = app
        .post(&format!("{base}/reject"), Some(&admin_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");

    let (status, body) = app
        .post(&format!("{base}/approve"), Some(&admin_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");
}

#[tokio::test]
async fn approving_twice_is_a_validation_error() {
    let app = TestApp::spawn().await;
    let (_, admin_token) = app.seed_admin().await;
    let (customer_id, _) = app.seed_customer(CustomerStatus::Approved).await;

    let (status, body) = app
        .post(
            &format!("/api/v1/admin/customers/{customer_id}/approve"),
            Some(&admin_token),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("Customer is already"));
}

#[tokio::test]
async fn only_pending_accounts_can_be_rejected() {
    let app = TestApp::spawn().await;
    let (_, admin_token) = app.seed_admin().await;
    let (customer_id, _) = app.seed_customer(CustomerStatus::Approved).await;

    let (status, body) = app
        .post(
            &format!("/api/v1/admin/customers/{customer_id}/reject"),
            Some(&admin_token),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("Cannot reject"));
}

#[tokio::test]
async fn suspend_and_reactivate_round_trip() {
    let app = TestApp::spawn().await;
    let (_, admin_token) = app.seed_admin().await;
    let (customer_id, _) = app.seed_customer(CustomerStatus::Approved).await;
    let base = format!("/api/v1/admin/customers/{customer_id}");

    let (status, body) = app
        .post(&format!("{base}/suspend"), Some(&admin_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "suspended");

    let (status, body) = app
        .post(&format!("{base}/reactivate"), Some(&admin_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");
}

#[tokio::test]
async fn deactivated_accounts_cannot_log_in() {
    let app = TestApp::spawn().await;
    let (_, admin_token) = app.seed_admin().await;
    let (customer_id, token) = app.seed_customer(CustomerStatus::Approved).await;
    let (_, me) = app.get("/api/v1/auth/me", Some(&token)).await;
    let email = me["email"].as_str().unwrap().to_owned();

    let (status, body) = app
        .patch(
            &format!("/api/v1/admin/customers/{customer_id}/active"),
            Some(&admin_token),
            json!({ "is_active": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);

    let (status, _) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": email, "password": common::TEST_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn listing_filters_by_status() {
    let app = TestApp::spawn().await;
    let (_, admin_token) = app.seed_admin().await;
    app.seed_customer(CustomerStatus::Pending).await;
    app.seed_customer(CustomerStatus::Pending).await;
    app.seed_customer(CustomerStatus::Approved).await;

    let (status, page) = app
        .get("/api/v1/admin/customers?status=pending", Some(&admin_token))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    for customer in page["items"].as_array().unwrap() {
        assert_eq!(customer["status"], "pending");
    }
}
