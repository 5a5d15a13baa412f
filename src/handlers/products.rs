//! Public catalog: product browsing plus the category and
//! manufacturer lists the storefront filters by. No authentication;
//! only active, visible products are reachable here.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::handlers::common::success_response;
use crate::services::catalog::ProductListParams;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/categories", get(list_categories))
        .route("/manufacturers", get(list_manufacturers))
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProductListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.services.catalog.list_products(params).await?;
    Ok(success_response(page))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.services.catalog.get_product(id).await?;
    Ok(success_response(product))
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(success_response(categories))
}

async fn list_manufacturers(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let manufacturers = state.services.catalog.list_manufacturers().await?;
    Ok(success_response(manufacturers))
}
