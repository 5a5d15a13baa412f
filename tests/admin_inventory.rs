//! Manual stock adjustments and the movement audit trail.

mod common;

use axum::http::StatusCode;
use sea_orm::EntityTrait;
use serde_json::json;

use common::TestApp;
use pharmahub_api::entities::{Product, ProductSection, StockMovement};

#[tokio::test]
async fn positive_adjustment_receives_stock() {
    let app = TestApp::spawn().await;
    let (_, admin_token) = app.seed_admin().await;
    let product = app
        .seed_product("SKU-1", "Amoxicillin 500mg", ProductSection::Medicines, 10_00, 5)
        .await;

    let (status, body) = app
        .post(
            &format!("/api/v1/admin/products/{product}/stock"),
            Some(&admin_token),
            json!({ "quantity_change": 20, "reason": "purchase", "note": "Restock PO-1234" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity_before"], 5);
    assert_eq!(body["quantity_after"], 25);
    assert_eq!(body["reason"], "purchase");

    let stock = Product::find_by_id(product)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap()
        .stock_quantity;
    assert_eq!(stock, 25);
}

#[tokio::test]
async fn negative_adjustment_cannot_go_below_zero() {
    let app = TestApp::spawn().await;
    let (_, admin_token) = app.seed_admin().await;
    let product = app
        .seed_product("SKU-1", "Amoxicillin 500mg", ProductSection::Medicines, 10_00, 5)
        .await;

    let (status, body) = app
        .post(
            &format!("/api/v1/admin/products/{product}/stock"),
            Some(&admin_token),
            json!({ "quantity_change": -10, "reason": "damage" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot reduce stock below 0");

    // Nothing moved and nothing was logged
    let stock = Product::find_by_id(product)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap()
        .stock_quantity;
    assert_eq!(stock, 5);
    let movements = StockMovement::find().all(&*app.db).await.unwrap();
    assert!(movements.is_empty());
}

#[tokio::test]
async fn zero_adjustment_is_rejected() {
    let app = TestApp::spawn().await;
    let (_, admin_token) = app.seed_admin().await;
    let product = app
        .seed_product("SKU-1", "Amoxicillin 500mg", ProductSection::Medicines, 10_00, 5)
        .await;

    let (status, body) = app
        .post(
            &format!("/api/v1/admin/products/{product}/stock"),
            Some(&admin_token),
            json!({ "quantity_change": 0, "reason": "other" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "quantity_change must not be zero");
}

#[tokio::test]
async fn adjusting_a_missing_product_is_not_found() {
    let app = TestApp::spawn().await;
    let (_, admin_token) = app.seed_admin().await;

    let (status, _) = app
        .post(
            &format!("/api/v1/admin/products/{}/stock", uuid::Uuid::new_v4()),
            Some(&admin_token),
            json!({ "quantity_change": 5, "reason": "purchase" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn movement_listing_records_the_acting_admin() {
    let app = TestApp::spawn().await;
    let (admin_id, admin_token) = app.seed_admin().await;
    let product = app
        .seed_product("SKU-1", "Amoxicillin 500mg", ProductSection::Medicines, 10_00, 5)
        .await;

    let path = format!("/api/v1/admin/products/{product}/stock");
    app.post(
        &path,
        Some(&admin_token),
        json!({ "quantity_change": 10, "reason": "purchase" }),
    )
    .await;
    app.post(
        &path,
        Some(&admin_token),
        json!({ "quantity_change": -3, "reason": "expired", "note": "Batch B-77" }),
    )
    .await;

    let (status, page) = app
        .get(
            &format!("/api/v1/admin/products/{product}/movements"),
            Some(&admin_token),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let items = page["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(page["total"], 2);
    for item in items {
        assert_eq!(item["actor"], format!("admin:{admin_id}"));
    }
    let expired = items
        .iter()
        .find(|m| m["reason"] == "expired")
        .expect("expired movement");
    assert_eq!(expired["quantity_change"], -3);
    assert_eq!(expired["note"], "Batch B-77");
}
