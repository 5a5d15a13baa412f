//! Order administration: the list/detail views and the status
//! transition endpoint guarded by the configured adjacency table.

use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, patch},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AdminAuth;
use crate::errors::ApiError;
use crate::handlers::common::{success_response, validate_input};
use crate::services::orders::AdminOrderListParams;
use crate::services::order_status::UpdateOrderStatusInput;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list))
        .route("/:id", get(get_one))
        .route("/:id/status", patch(update_status))
}

async fn list(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
    Query(params): Query<AdminOrderListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.services.orders.admin_list(params).await?;
    Ok(success_response(page))
}

async fn get_one(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.services.orders.admin_get(id).await?;
    Ok(success_response(order))
}

/// A transition outside the table comes back as 400 with the legal
/// next states in `details.allowed`.
async fn update_status(
    State(state): State<Arc<AppState>>,
    AdminAuth(admin): AdminAuth,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    state
        .services
        .order_status
        .update_status(id, &admin.actor(), payload)
        .await?;
    let order = state.services.orders.admin_get(id).await?;
    Ok(success_response(order))
}
