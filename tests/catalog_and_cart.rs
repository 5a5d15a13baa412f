//! Public catalog visibility and the reconciled cart.

mod common;

use axum::http::StatusCode;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;

use common::TestApp;
use pharmahub_api::entities::{product, CustomerStatus, Product, ProductSection};

#[tokio::test]
async fn public_listing_excludes_hidden_and_inactive() {
    let app = TestApp::spawn().await;
    let visible = app
        .seed_product("SKU-1", "Amoxicillin 500mg", ProductSection::Medicines, 12_50, 10)
        .await;
    let hidden = app
        .seed_product("SKU-2", "Hidden Product", ProductSection::Medicines, 9_99, 10)
        .await;

    let model = Product::find_by_id(hidden)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    let mut active: product::ActiveModel = model.into();
    active.is_visible = Set(false);
    active.update(&*app.db).await.unwrap();

    let (status, body) = app.get("/api/v1/products", None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], visible.to_string());
    assert_eq!(body["total"], 1);

    let (status, _) = app
        .get(&format!("/api/v1/products/{hidden}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_search_matches_name_and_sku() {
    let app = TestApp::spawn().await;
    app.seed_product("AMX-500", "Amoxicillin 500mg", ProductSection::Medicines, 12_50, 10)
        .await;
    app.seed_product("IBU-200", "Ibuprofen 200mg", ProductSection::Medicines, 4_00, 10)
        .await;

    let (status, body) = app.get("/api/v1/products?q=amoxi", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let (_, body) = app.get("/api/v1/products?q=IBU", None).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["sku"], "IBU-200");
}

#[tokio::test]
async fn add_item_builds_cart_with_subtotal() {
    let app = TestApp::spawn().await;
    let (_, token) = app.seed_customer(CustomerStatus::Approved).await;
    let product_id = app
        .seed_product("SKU-1", "Amoxicillin 500mg", ProductSection::Medicines, 100_00, 10)
        .await;

    let (status, body) = app
        .post(
            "/api/v1/cart",
            Some(&token),
            json!({ "product_id": product_id, "quantity": 3 }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["quantity"], 3);
    assert_eq!(body["items"][0]["line_total"], "300.00");
    assert_eq!(body["subtotal"], "300.00");
    assert!(body["warnings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn add_item_twice_sums_quantities_clamped_to_stock() {
    let app = TestApp::spawn().await;
    let (_, token) = app.seed_customer(CustomerStatus::Approved).await;
    let product_id = app
        .seed_product("SKU-1", "Amoxicillin 500mg", ProductSection::Medicines, 10_00, 5)
        .await;

    app.post(
        "/api/v1/cart",
        Some(&token),
        json!({ "product_id": product_id, "quantity": 3 }),
    )
    .await;
    let (_, body) = app
        .post(
            "/api/v1/cart",
            Some(&token),
            json!({ "product_id": product_id, "quantity": 4 }),
        )
        .await;

    // 3 + 4 exceeds the 5 on hand
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["quantity"], 5);
}

#[tokio::test]
async fn spc_products_cannot_be_added() {
    let app = TestApp::spawn().await;
    let (_, token) = app.seed_customer(CustomerStatus::Approved).await;
    let product_id = app
        .seed_product("SPC-1", "Display Only", ProductSection::Spc, 10_00, 5)
        .await;

    let (status, body) = app
        .post(
            "/api/v1/cart",
            Some(&token),
            json!({ "product_id": product_id, "quantity": 1 }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "This product is not available for purchase");
}

#[tokio::test]
async fn stocked_out_product_is_a_conflict() {
    let app = TestApp::spawn().await;
    let (_, token) = app.seed_customer(CustomerStatus::Approved).await;
    let product_id = app
        .seed_product("SKU-1", "Out of Stock", ProductSection::Medicines, 10_00, 0)
        .await;

    let (status, body) = app
        .post(
            "/api/v1/cart",
            Some(&token),
            json!({ "product_id": product_id, "quantity": 2 }),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    let shortages = body["details"]["items"].as_array().unwrap();
    assert_eq!(shortages[0]["requested"], 2);
    assert_eq!(shortages[0]["available"], 0);
}

#[tokio::test]
async fn cart_reconciliation_clamps_to_reduced_stock() {
    let app = TestApp::spawn().await;
    let (_, token) = app.seed_customer(CustomerStatus::Approved).await;
    let product_id = app
        .seed_product("SKU-1", "Amoxicillin 500mg", ProductSection::Medicines, 10_00, 5)
        .await;

    app.post(
        "/api/v1/cart",
        Some(&token),
        json!({ "product_id": product_id, "quantity": 4 }),
    )
    .await;

    // Stock drops behind the cart's back
    let model = Product::find_by_id(product_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    let mut active: product::ActiveModel = model.into();
    active.stock_quantity = Set(1);
    active.update(&*app.db).await.unwrap();

    let (status, body) = app.get("/api/v1/cart", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["quantity"], 1);
    let warnings = body["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["code"], "quantity_reduced");
    assert_eq!(warnings[0]["quantity"], 1);
}

#[tokio::test]
async fn cart_reconciliation_removes_unavailable_products() {
    let app = TestApp::spawn().await;
    let (_, token) = app.seed_customer(CustomerStatus::Approved).await;
    let product_id = app
        .seed_product("SKU-1", "Discontinued", ProductSection::Medicines, 10_00, 5)
        .await;

    app.post(
        "/api/v1/cart",
        Some(&token),
        json!({ "product_id": product_id, "quantity": 2 }),
    )
    .await;

    let model = Product::find_by_id(product_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    let mut active: product::ActiveModel = model.into();
    active.is_active = Set(false);
    active.update(&*app.db).await.unwrap();

    let (_, body) = app.get("/api/v1/cart", Some(&token)).await;
    assert!(body["items"].as_array().unwrap().is_empty());
    let warnings = body["warnings"].as_array().unwrap();
    assert_eq!(warnings[0]["code"], "removed");

    // The fix-up is persisted, not recomputed per read
    let (_, body) = app.get("/api/v1/cart", Some(&token)).await;
    assert!(body["warnings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn update_and_remove_cart_line() {
    let app = TestApp::spawn().await;
    let (_, token) = app.seed_customer(CustomerStatus::Approved).await;
    let product_id = app
        .seed_product("SKU-1", "Amoxicillin 500mg", ProductSection::Medicines, 10_00, 10)
        .await;

    let (_, body) = app
        .post(
            "/api/v1/cart",
            Some(&token),
            json!({ "product_id": product_id, "quantity": 2 }),
        )
        .await;
    let line_id = body["items"][0]["id"].as_str().unwrap().to_owned();

    let (status, body) = app
        .patch(
            &format!("/api/v1/cart/{line_id}"),
            Some(&token),
            json!({ "quantity": 7 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["quantity"], 7);

    let (status, body) = app
        .delete(&format!("/api/v1/cart/{line_id}"), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn cart_lines_are_scoped_to_their_owner() {
    let app = TestApp::spawn().await;
    let (_, owner_token) = app.seed_customer(CustomerStatus::Approved).await;
    let (_, other_token) = app.seed_customer(CustomerStatus::Approved).await;
    let product_id = app
        .seed_product("SKU-1", "Amoxicillin 500mg", ProductSection::Medicines, 10_00, 10)
        .await;

    let (_, body) = app
        .post(
            "/api/v1/cart",
            Some(&owner_token),
            json!({ "product_id": product_id, "quantity": 2 }),
        )
        .await;
    let line_id = body["items"][0]["id"].as_str().unwrap().to_owned();

    let (status, _) = app
        .patch(
            &format!("/api/v1/cart/{line_id}"),
            Some(&other_token),
            json!({ "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
