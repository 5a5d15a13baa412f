//! Product image uploads.
//!
//! The declared content type is never trusted: the stored type and the
//! file extension both come from the magic bytes. Keys are random
//! UUIDs, so a hostile filename never reaches the object store.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::errors::ServiceError;
use crate::storage::ObjectStorage;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadedImage {
    /// Object-store key, stored on the product as `image_key`
    pub key: String,
    pub url: Option<String>,
    pub content_type: String,
    pub size_bytes: usize,
}

#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn ObjectStorage>,
    allowed_image_types: Vec<String>,
    max_bytes: usize,
}

impl UploadService {
    pub fn new(storage: Arc<dyn ObjectStorage>, config: &UploadConfig) -> Self {
        Self {
            storage,
            allowed_image_types: config.allowed_image_types.clone(),
            max_bytes: config.max_bytes,
        }
    }

    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    pub async fn store_product_image(
        &self,
        bytes: Vec<u8>,
        declared_type: Option<&str>,
    ) -> Result<UploadedImage, ServiceError> {
        if bytes.is_empty() {
            return Err(ServiceError::ValidationError(
                "Uploaded file is empty".into(),
            ));
        }
        if bytes.len() > self.max_bytes {
            return Err(ServiceError::ValidationError(format!(
                "File exceeds the {} byte upload limit",
                self.max_bytes
            )));
        }

        let kind = infer::get(&bytes).ok_or_else(|| {
            ServiceError::ValidationError("Could not determine the file type".into())
        })?;
        let verified = kind.mime_type();

        if let Some(declared) = declared_type {
            if !declared.eq_ignore_ascii_case(verified) {
                return Err(ServiceError::ValidationError(format!(
                    "Declared content type '{}' does not match the file contents ('{}')",
                    declared, verified
                )));
            }
        }
        if !self
            .allowed_image_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(verified))
        {
            return Err(ServiceError::ValidationError(format!(
                "Content type '{}' is not allowed",
                verified
            )));
        }

        let size_bytes = bytes.len();
        let key = format!("products/{}.{}", Uuid::new_v4(), kind.extension());
        self.storage.put(&key, bytes, verified).await?;

        info!(%key, content_type = verified, size_bytes, "image stored");
        Ok(UploadedImage {
            url: self.storage.public_url(&key),
            key,
            content_type: verified.to_string(),
            size_bytes,
        })
    }
}
