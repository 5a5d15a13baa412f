//! Customer verification and account management.

use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AdminAuth;
use crate::errors::ApiError;
use crate::handlers::common::success_response;
use crate::services::customers::{AdminCustomerListParams, SetActiveInput};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list))
        .route("/:id", get(get_one))
        .route("/:id/approve", post(approve))
        .route("/:id/reject", post(reject))
        .route("/:id/suspend", post(suspend))
        .route("/:id/reactivate", post(reactivate))
        .route("/:id/active", patch(set_active))
}

async fn list(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
    Query(params): Query<AdminCustomerListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.services.customers.admin_list(params).await?;
    Ok(success_response(page))
}

async fn get_one(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = state.services.customers.admin_get(id).await?;
    Ok(success_response(customer))
}

async fn approve(
    State(state): State<Arc<AppState>>,
    AdminAuth(admin): AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = state
        .services
        .customers
        .approve(id, &admin.actor())
        .await?;
    Ok(success_response(customer))
}

async fn reject(
    State(state): State<Arc<AppState>>,
    AdminAuth(admin): AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = state.services.customers.reject(id, &admin.actor()).await?;
    Ok(success_response(customer))
}

async fn suspend(
    State(state): State<Arc<AppState>>,
    AdminAuth(admin): AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = state
        .services
        .customers
        .suspend(id, &admin.actor())
        .await?;
    Ok(success_response(customer))
}

async fn reactivate(
    State(state): State<Arc<AppState>>,
    AdminAuth(admin): AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = state
        .services
        .customers
        .reactivate(id, &admin.actor())
        .await?;
    Ok(success_response(customer))
}

async fn set_active(
    State(state): State<Arc<AppState>>,
    AdminAuth(admin): AdminAuth,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActiveInput>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = state
        .services
        .customers
        .set_active(id, &admin.actor(), payload)
        .await?;
    Ok(success_response(customer))
}
