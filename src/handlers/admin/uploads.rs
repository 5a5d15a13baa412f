//! Product image uploads into the configured object store.

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use std::sync::Arc;

use crate::auth::AdminAuth;
use crate::errors::ApiError;
use crate::handlers::common::created_response;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/uploads/images", post(upload_image))
}

async fn upload_image(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut file: Option<(Vec<u8>, Option<String>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let declared = field.content_type().map(|ct| ct.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read file field: {}", e)))?;
            file = Some((data.to_vec(), declared));
        }
    }
    let (bytes, declared_type) =
        file.ok_or_else(|| ApiError::BadRequest("Missing multipart field \"file\"".into()))?;

    let uploaded = state
        .services
        .uploads
        .store_product_image(bytes, declared_type.as_deref())
        .await?;
    Ok(created_response(uploaded))
}
