//! Registration, login, and the token-kind boundary between the
//! storefront and the admin surface.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestApp, TEST_PASSWORD};
use pharmahub_api::entities::CustomerStatus;

fn register_payload(email: &str) -> serde_json::Value {
    json!({
        "email": email,
        "password": TEST_PASSWORD,
        "pharmacy_name": "Corner Pharmacy",
        "contact_name": "A. Pharmacist",
        "phone": "555-0101",
    })
}

#[tokio::test]
async fn register_creates_pending_account_with_session() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            None,
            register_payload("new@pharmahub.test"),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["customer"]["email"], "new@pharmahub.test");
    assert_eq!(body["customer"]["status"], "pending");
    assert!(body["token"].is_string());
    assert!(body["expires_in"].is_i64());
}

#[tokio::test]
async fn register_rejects_duplicate_email() {
    let app = TestApp::spawn().await;
    let payload = register_payload("dup@pharmahub.test");

    let (first, _) = app.post("/api/v1/auth/register", None, payload.clone()).await;
    assert_eq!(first, StatusCode::CREATED);

    let (second, body) = app.post("/api/v1/auth/register", None, payload).await;
    assert_eq!(second, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already registered");
}

#[tokio::test]
async fn register_validates_fields() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({
                "email": "not-an-email",
                "password": "short",
                "pharmacy_name": "",
                "contact_name": "A",
                "phone": "555-0101",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields = body["details"]["fields"].as_object().unwrap();
    assert!(fields.contains_key("email"));
    assert!(fields.contains_key("password"));
    assert!(fields.contains_key("pharmacy_name"));
}

#[tokio::test]
async fn pending_customer_can_log_in() {
    let app = TestApp::spawn().await;
    app.post(
        "/api/v1/auth/register",
        None,
        register_payload("waiting@pharmahub.test"),
    )
    .await;

    let (status, body) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": "waiting@pharmahub.test", "password": TEST_PASSWORD }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customer"]["status"], "pending");
}

#[tokio::test]
async fn suspended_customer_cannot_log_in() {
    let app = TestApp::spawn().await;
    let (_, token) = app.seed_customer(CustomerStatus::Suspended).await;

    // The seeded email is opaque; go through /me to confirm the token
    // works, then verify password login is refused for the account.
    let (me_status, me) = app.get("/api/v1/auth/me", Some(&token)).await;
    assert_eq!(me_status, StatusCode::OK);
    let email = me["email"].as_str().unwrap();

    let (status, body) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": email, "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::spawn().await;
    let (_, token) = app.seed_customer(CustomerStatus::Approved).await;
    let (_, me) = app.get("/api/v1/auth/me", Some(&token)).await;
    let email = me["email"].as_str().unwrap();

    let (status, _) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": email, "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = TestApp::spawn().await;

    let (status, _) = app.get("/api/v1/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/v1/cart", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn customer_token_is_rejected_on_admin_routes() {
    let app = TestApp::spawn().await;
    let (_, customer_token) = app.seed_customer(CustomerStatus::Approved).await;

    let (status, _) = app
        .get("/api/v1/admin/orders", Some(&customer_token))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_token_is_rejected_on_customer_routes() {
    let app = TestApp::spawn().await;
    let (_, admin_token) = app.seed_admin().await;

    let (status, _) = app.get("/api/v1/cart", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_login_and_me_round_trip() {
    let app = TestApp::spawn().await;
    let (admin_id, admin_token) = app.seed_admin().await;

    let (me_status, me) = app
        .get("/api/v1/admin/auth/me", Some(&admin_token))
        .await;
    assert_eq!(me_status, StatusCode::OK);
    assert_eq!(me["id"], admin_id.to_string());

    let email = me["email"].as_str().unwrap();
    let (status, body) = app
        .post(
            "/api/v1/admin/auth/login",
            None,
            json!({ "email": email, "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
    assert_eq!(body["admin"]["email"], email);
}

#[tokio::test]
async fn profile_update_changes_contact_details() {
    let app = TestApp::spawn().await;
    let (_, token) = app.seed_customer(CustomerStatus::Approved).await;

    let (status, body) = app
        .patch(
            "/api/v1/auth/me",
            Some(&token),
            json!({ "contact_name": "New Contact" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contact_name"], "New Contact");
    assert_eq!(body["pharmacy_name"], "Test Pharmacy");
}
