//! Delivery address book for the signed-in customer.

use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::CustomerAuth;
use crate::errors::ApiError;
use crate::handlers::common::{created_response, no_content_response, success_response, validate_input};
use crate::services::addresses::{CreateAddressInput, UpdateAddressInput};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", axum::routing::patch(update).delete(remove))
}

async fn list(
    State(state): State<Arc<AppState>>,
    CustomerAuth(customer): CustomerAuth,
) -> Result<impl IntoResponse, ApiError> {
    let addresses = state.services.addresses.list(customer.id).await?;
    Ok(success_response(addresses))
}

async fn create(
    State(state): State<Arc<AppState>>,
    CustomerAuth(customer): CustomerAuth,
    Json(payload): Json<CreateAddressInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let address = state
        .services
        .addresses
        .create(customer.id, payload)
        .await?;
    Ok(created_response(address))
}

async fn update(
    State(state): State<Arc<AppState>>,
    CustomerAuth(customer): CustomerAuth,
    Path(address_id): Path<Uuid>,
    Json(payload): Json<UpdateAddressInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let address = state
        .services
        .addresses
        .update(customer.id, address_id, payload)
        .await?;
    Ok(success_response(address))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    CustomerAuth(customer): CustomerAuth,
    Path(address_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .addresses
        .delete(customer.id, address_id)
        .await?;
    Ok(no_content_response())
}
