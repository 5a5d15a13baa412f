//! Cart endpoints. Every response is the reconciled cart view, so the
//! client never has to merge a mutation result with a stale read.

use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, patch},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::CustomerAuth;
use crate::errors::ApiError;
use crate::handlers::common::{success_response, validate_input};
use crate::services::cart::{AddCartItemInput, UpdateCartItemInput};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_cart).post(add_item))
        .route("/:id", patch(update_item))
        .route("/:id", delete(remove_item))
}

async fn get_cart(
    State(state): State<Arc<AppState>>,
    CustomerAuth(customer): CustomerAuth,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state.services.cart.get_cart(customer.id).await?;
    Ok(success_response(cart))
}

async fn add_item(
    State(state): State<Arc<AppState>>,
    CustomerAuth(customer): CustomerAuth,
    Json(payload): Json<AddCartItemInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let cart = state.services.cart.add_item(customer.id, payload).await?;
    Ok(success_response(cart))
}

async fn update_item(
    State(state): State<Arc<AppState>>,
    CustomerAuth(customer): CustomerAuth,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let cart = state
        .services
        .cart
        .update_item(customer.id, item_id, payload)
        .await?;
    Ok(success_response(cart))
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    CustomerAuth(customer): CustomerAuth,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .remove_item(customer.id, item_id)
        .await?;
    Ok(success_response(cart))
}
