//! Manual stock adjustment and the per-product movement trail.

use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AdminAuth;
use crate::errors::ApiError;
use crate::handlers::common::{success_response, validate_input};
use crate::services::inventory::{AdjustStockInput, MovementListParams};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/products/:id/stock", post(adjust_stock))
        .route("/products/:id/movements", get(list_movements))
}

async fn adjust_stock(
    State(state): State<Arc<AppState>>,
    AdminAuth(admin): AdminAuth,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<AdjustStockInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let adjustment = state
        .services
        .inventory
        .adjust_stock(product_id, &admin.actor(), payload)
        .await?;
    Ok(success_response(adjustment))
}

async fn list_movements(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
    Path(product_id): Path<Uuid>,
    Query(params): Query<MovementListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .services
        .inventory
        .list_movements(product_id, params)
        .await?;
    Ok(success_response(page))
}
