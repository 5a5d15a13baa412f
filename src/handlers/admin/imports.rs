//! Bulk product import from an uploaded CSV file.

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use std::sync::Arc;

use crate::auth::AdminAuth;
use crate::errors::ApiError;
use crate::handlers::common::success_response;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/imports/products", post(import_products))
}

async fn import_products(
    State(state): State<Arc<AppState>>,
    AdminAuth(admin): AdminAuth,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let limit = state.config.uploads.import_max_bytes;
    let mut bytes: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read file field: {}", e)))?;
            if data.len() > limit {
                return Err(ApiError::BadRequest(format!(
                    "CSV exceeds the {} byte upload limit",
                    limit
                )));
            }
            bytes = Some(data.to_vec());
        }
    }
    let bytes =
        bytes.ok_or_else(|| ApiError::BadRequest("Missing multipart field \"file\"".into()))?;

    let outcome = state
        .services
        .imports
        .import_products(&admin.actor(), &bytes)
        .await?;
    Ok(success_response(outcome))
}
