//! Checkout and the customer's own order history.
//!
//! `GET /delivery-quote` previews the fee for a method/address pair
//! before the customer commits; `POST /orders` is the placement
//! transaction described in `services::orders`.

use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::CustomerAuth;
use crate::entities::DeliveryMethod;
use crate::errors::ApiError;
use crate::handlers::common::{created_response, success_response};
use crate::services::orders::{OrderListParams, PlaceOrderInput};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", get(list_orders).post(place_order))
        .route("/orders/:id", get(get_order))
        .route("/delivery-quote", get(delivery_quote))
}

#[derive(Debug, Deserialize, IntoParams)]
struct QuoteParams {
    method: DeliveryMethod,
    address_id: Option<Uuid>,
}

async fn delivery_quote(
    State(state): State<Arc<AppState>>,
    CustomerAuth(customer): CustomerAuth,
    Query(params): Query<QuoteParams>,
) -> Result<impl IntoResponse, ApiError> {
    let quote = state
        .services
        .delivery
        .quote(customer.id, params.method, params.address_id)
        .await?;
    Ok(success_response(quote))
}

async fn place_order(
    State(state): State<Arc<AppState>>,
    CustomerAuth(customer): CustomerAuth,
    Json(payload): Json<PlaceOrderInput>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.services.orders.place_order(customer.id, payload).await?;
    Ok(created_response(order))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    CustomerAuth(customer): CustomerAuth,
    Query(params): Query<OrderListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .services
        .orders
        .list_for_customer(customer.id, params)
        .await?;
    Ok(success_response(page))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    CustomerAuth(customer): CustomerAuth,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_for_customer(customer.id, order_id)
        .await?;
    Ok(success_response(order))
}
