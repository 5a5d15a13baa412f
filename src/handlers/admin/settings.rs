//! Store settings: name, address, and the coordinates behind the
//! delivery calculator.

use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::auth::AdminAuth;
use crate::errors::ApiError;
use crate::handlers::common::{success_response, validate_input};
use crate::services::settings::UpdateStoreSettingsInput;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/store", get(show).patch(update))
}

async fn show(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
) -> Result<impl IntoResponse, ApiError> {
    let settings = state.services.settings.store_settings().await?;
    Ok(success_response(settings))
}

async fn update(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
    Json(payload): Json<UpdateStoreSettingsInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let settings = state
        .services
        .settings
        .update_store_settings(payload)
        .await?;
    Ok(success_response(settings))
}
