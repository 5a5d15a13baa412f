//! Admin catalog management: products (including the bulk price
//! update), categories, and manufacturers.

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
use crate::handlers::common::{
    created_response, no_content_response, success_response, validate_input,
};
use crate::services::catalog::{
    AdminProductListParams, BulkPriceUpdateInput, CategoryInput, CreateProductInput,
    ManufacturerInput, UpdateProductInput,
};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/bulk-prices", post(bulk_update_prices))
        .route("/products/:id", get(get_product).patch(update_product))
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            axum::routing::patch(update_category).delete(delete_category),
        )
        .route(
            "/manufacturers",
            get(list_manufacturers).post(create_manufacturer),
        )
        .route(
            "/manufacturers/:id",
            axum::routing::patch(update_manufacturer).delete(delete_manufacturer),
        )
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
    Query(params): Query<AdminProductListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.services.catalog.admin_list_products(params).await?;
    Ok(success_response(page))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.services.catalog.admin_get_product(id).await?;
    Ok(success_response(product))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    AdminAuth(admin): AdminAuth,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let product = state
        .services
        .catalog
        .create_product(payload, admin.actor())
        .await?;
    Ok(created_response(product))
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let product = state.services.catalog.update_product(id, payload).await?;
    Ok(success_response(product))
}

/// Applies each price change independently and reports
/// `updated`/`total` counts; a bad row never aborts the batch.
async fn bulk_update_prices(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
    Json(payload): Json<BulkPriceUpdateInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let outcome = state.services.catalog.bulk_update_prices(payload).await?;
    Ok(success_response(outcome))
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(success_response(categories))
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
    Json(payload): Json<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let category = state.services.catalog.create_category(payload).await?;
    Ok(created_response(category))
}

async fn update_category(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let category = state.services.catalog.update_category(id, payload).await?;
    Ok(success_response(category))
}

async fn delete_category(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.catalog.delete_category(id).await?;
    Ok(no_content_response())
}

async fn list_manufacturers(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
) -> Result<impl IntoResponse, ApiError> {
    let manufacturers = state.services.catalog.list_manufacturers().await?;
    Ok(success_response(manufacturers))
}

async fn create_manufacturer(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
    Json(payload): Json<ManufacturerInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let manufacturer = state.services.catalog.create_manufacturer(payload).await?;
    Ok(created_response(manufacturer))
}

async fn update_manufacturer(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
    Path(id): Path<Uuid>,
    Json(payload): Json<ManufacturerInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let manufacturer = state
        .services
        .catalog
        .update_manufacturer(id, payload)
        .await?;
    Ok(success_response(manufacturer))
}

async fn delete_manufacturer(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.catalog.delete_manufacturer(id).await?;
    Ok(no_content_response())
}
