//! Checkout, the placement transaction, and the admin status lifecycle.

mod common;

use axum::http::StatusCode;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::{json, Value};

use common::TestApp;
use pharmahub_api::entities::{
    stock_movement, CustomerStatus, Product, ProductSection, StockMovement, StockMovementReason,
};

async fn fill_cart(app: &TestApp, token: &str, items: &[(uuid::Uuid, i32)]) {
    for (product_id, quantity) in items {
        let (status, _) = app
            .post(
                "/api/v1/cart",
                Some(token),
                json!({ "product_id": product_id, "quantity": quantity }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}

async fn place_pickup_order(app: &TestApp, token: &str) -> Value {
    let (status, body) = app
        .post(
            "/api/v1/orders",
            Some(token),
            json!({ "delivery_method": "pickup", "payment_method": "cash_on_delivery" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn pickup_order_snapshots_cart_and_decrements_stock() {
    let app = TestApp::spawn().await;
    let (customer_id, token) = app.seed_customer(CustomerStatus::Approved).await;
    let amox = app
        .seed_product("AMX-500", "Amoxicillin 500mg", ProductSection::Medicines, 100_00, 10)
        .await;
    let ibu = app
        .seed_product("IBU-200", "Ibuprofen 200mg", ProductSection::Medicines, 50_00, 4)
        .await;

    fill_cart(&app, &token, &[(amox, 2), (ibu, 1)]).await;
    let order = place_pickup_order(&app, &token).await;

    assert!(order["order_number"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(order["customer_id"], customer_id.to_string());
    assert_eq!(order["status"], "new");
    assert_eq!(order["payment_status"], "pending");
    assert_eq!(order["subtotal"], "250.00");
    assert_eq!(order["total"], "250.00");

    let items = order["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    let amox_line = items
        .iter()
        .find(|i| i["sku"] == "AMX-500")
        .expect("amoxicillin line");
    assert_eq!(amox_line["quantity"], 2);
    assert_eq!(amox_line["unit_price"], "100.00");
    assert_eq!(amox_line["line_total"], "200.00");

    let history = order["history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["to_status"], "new");

    // Stock comes off the shelf in the same transaction
    let product = Product::find_by_id(amox)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.stock_quantity, 8);
    assert_eq!(product.total_sold, 2);

    // ...with a sale movement pointing back at the order
    let movements = StockMovement::find()
        .filter(stock_movement::Column::ProductId.eq(amox))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].reason, StockMovementReason::Sale);
    assert_eq!(movements[0].quantity_change, -2);
    assert_eq!(movements[0].quantity_before, 10);
    assert_eq!(movements[0].quantity_after, 8);
    assert_eq!(
        movements[0].order_id.map(|id| id.to_string()),
        order["id"].as_str().map(str::to_owned)
    );

    // ...and the cart is emptied
    let (_, cart) = app.get("/api/v1/cart", Some(&token)).await;
    assert!(cart["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn empty_cart_cannot_be_checked_out() {
    let app = TestApp::spawn().await;
    let (_, token) = app.seed_customer(CustomerStatus::Approved).await;

    let (status, _) = app
        .post(
            "/api/v1/orders",
            Some(&token),
            json!({ "delivery_method": "pickup", "payment_method": "cash_on_delivery" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn standard_delivery_requires_an_address() {
    let app = TestApp::spawn().await;
    let (_, token) = app.seed_customer(CustomerStatus::Approved).await;
    let product = app
        .seed_product("SKU-1", "Amoxicillin 500mg", ProductSection::Medicines, 10_00, 5)
        .await;
    fill_cart(&app, &token, &[(product, 1)]).await;

    let (status, body) = app
        .post(
            "/api/v1/orders",
            Some(&token),
            json!({ "delivery_method": "standard", "payment_method": "bank_transfer" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "address_id is required for this delivery method"
    );
}

#[tokio::test]
async fn standard_delivery_without_coordinates_gets_pending_fee() {
    let app = TestApp::spawn().await;
    let (_, token) = app.seed_customer(CustomerStatus::Approved).await;
    let product = app
        .seed_product("SKU-1", "Amoxicillin 500mg", ProductSection::Medicines, 10_00, 5)
        .await;
    fill_cart(&app, &token, &[(product, 1)]).await;

    let (status, address) = app
        .post(
            "/api/v1/addresses",
            Some(&token),
            json!({ "street": "1 High St", "city": "Springfield" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let address_id = address["id"].as_str().unwrap().to_owned();

    let (status, order) = app
        .post(
            "/api/v1/orders",
            Some(&token),
            json!({
                "delivery_method": "standard",
                "payment_method": "bank_transfer",
                "address_id": address_id,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        order["delivery_fee_note"],
        "Delivery fee will be confirmed after review"
    );
    assert!(order["delivery_address"].as_str().unwrap().contains("1 High St"));
}

#[tokio::test]
async fn pending_customer_cannot_place_orders() {
    let app = TestApp::spawn().await;
    let (_, token) = app.seed_customer(CustomerStatus::Pending).await;
    let product = app
        .seed_product("SKU-1", "Amoxicillin 500mg", ProductSection::Medicines, 10_00, 5)
        .await;
    fill_cart(&app, &token, &[(product, 1)]).await;

    let (status, body) = app
        .post(
            "/api/v1/orders",
            Some(&token),
            json!({ "delivery_method": "pickup", "payment_method": "cash_on_delivery" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Your account must be approved before placing orders"
    );
}

#[tokio::test]
async fn shortage_report_itemizes_every_lacking_line() {
    let app = TestApp::spawn().await;
    let (_, token) = app.seed_customer(CustomerStatus::Approved).await;
    let scarce = app
        .seed_product("SKU-1", "Scarce", ProductSection::Medicines, 10_00, 5)
        .await;
    fill_cart(&app, &token, &[(scarce, 5)]).await;

    // A competing checkout drains the shelf after the cart was filled
    let (_, rival_token) = app.seed_customer(CustomerStatus::Approved).await;
    fill_cart(&app, &rival_token, &[(scarce, 3)]).await;
    place_pickup_order(&app, &rival_token).await;

    let (status, body) = app
        .post(
            "/api/v1/orders",
            Some(&token),
            json!({ "delivery_method": "pickup", "payment_method": "cash_on_delivery" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let shortages = body["details"]["items"].as_array().unwrap();
    assert_eq!(shortages.len(), 1);
    assert_eq!(shortages[0]["requested"], 5);
    assert_eq!(shortages[0]["available"], 2);
}

#[tokio::test]
async fn customers_only_see_their_own_orders() {
    let app = TestApp::spawn().await;
    let (_, owner_token) = app.seed_customer(CustomerStatus::Approved).await;
    let (_, other_token) = app.seed_customer(CustomerStatus::Approved).await;
    let product = app
        .seed_product("SKU-1", "Amoxicillin 500mg", ProductSection::Medicines, 10_00, 5)
        .await;
    fill_cart(&app, &owner_token, &[(product, 1)]).await;
    let order = place_pickup_order(&app, &owner_token).await;
    let order_id = order["id"].as_str().unwrap();

    let (status, _) = app
        .get(&format!("/api/v1/orders/{order_id}"), Some(&owner_token))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Someone else's order reads as missing, not forbidden
    let (status, _) = app
        .get(&format!("/api/v1/orders/{order_id}"), Some(&other_token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, page) = app.get("/api/v1/orders", Some(&other_token)).await;
    assert!(page["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn admin_walks_the_order_through_its_lifecycle() {
    let app = TestApp::spawn().await;
    let (_, token) = app.seed_customer(CustomerStatus::Approved).await;
    let (_, admin_token) = app.seed_admin().await;
    let product = app
        .seed_product("SKU-1", "Amoxicillin 500mg", ProductSection::Medicines, 10_00, 5)
        .await;
    fill_cart(&app, &token, &[(product, 1)]).await;
    let order = place_pickup_order(&app, &token).await;
    let order_id = order["id"].as_str().unwrap().to_owned();
    let status_path = format!("/api/v1/admin/orders/{order_id}/status");

    for next in ["confirmed", "packing", "ready", "dispatched", "delivered"] {
        let (status, body) = app
            .patch(&status_path, Some(&admin_token), json!({ "status": next }))
            .await;
        assert_eq!(status, StatusCode::OK, "transition to {next}");
        assert_eq!(body["status"], next);
    }

    let (_, detail) = app
        .get(
            &format!("/api/v1/admin/orders/{order_id}"),
            Some(&admin_token),
        )
        .await;
    // Placement plus five transitions
    assert_eq!(detail["history"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn illegal_transition_reports_the_legal_next_states() {
    let app = TestApp::spawn().await;
    let (_, token) = app.seed_customer(CustomerStatus::Approved).await;
    let (_, admin_token) = app.seed_admin().await;
    let product = app
        .seed_product("SKU-1", "Amoxicillin 500mg", ProductSection::Medicines, 10_00, 5)
        .await;
    fill_cart(&app, &token, &[(product, 1)]).await;
    let order = place_pickup_order(&app, &token).await;
    let order_id = order["id"].as_str().unwrap();

    let (status, body) = app
        .patch(
            &format!("/api/v1/admin/orders/{order_id}/status"),
            Some(&admin_token),
            json!({ "status": "delivered" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["from"], "new");
    assert_eq!(body["details"]["to"], "delivered");
    let allowed: Vec<&str> = body["details"]["allowed"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(allowed.contains(&"confirmed"));
    assert!(allowed.contains(&"cancelled"));
}

#[tokio::test]
async fn cancelled_orders_are_terminal() {
    let app = TestApp::spawn().await;
    let (_, token) = app.seed_customer(CustomerStatus::Approved).await;
    let (_, admin_token) = app.seed_admin().await;
    let product = app
        .seed_product("SKU-1", "Amoxicillin 500mg", ProductSection::Medicines, 10_00, 5)
        .await;
    fill_cart(&app, &token, &[(product, 1)]).await;
    let order = place_pickup_order(&app, &token).await;
    let status_path = format!(
        "/api/v1/admin/orders/{}/status",
        order["id"].as_str().unwrap()
    );

    let (status, _) = app
        .patch(&status_path, Some(&admin_token), json!({ "status": "cancelled" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .patch(&status_path, Some(&admin_token), json!({ "status": "confirmed" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["allowed"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn delivery_quote_previews_the_fee() {
    let app = TestApp::spawn().await;
    let (_, token) = app.seed_customer(CustomerStatus::Approved).await;

    let (status, quote) = app
        .get("/api/v1/delivery-quote?method=pickup", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["note"], "Pickup at store; no delivery fee");

    let (_, address) = app
        .post(
            "/api/v1/addresses",
            Some(&token),
            json!({ "street": "1 High St", "city": "Springfield" }),
        )
        .await;
    let address_id = address["id"].as_str().unwrap();

    // Store coordinates are unset, so the fee stays pending
    let (status, quote) = app
        .get(
            &format!("/api/v1/delivery-quote?method=standard&address_id={address_id}"),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["note"], "Delivery fee will be confirmed after review");
}
