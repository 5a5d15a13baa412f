//! Store settings: the single row holding the store's display name,
//! address text, and the coordinates the delivery calculator uses.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::entities::{store_settings, StoreSettings, StoreSettingsModel, SETTINGS_ROW_ID};
use crate::errors::ServiceError;
use crate::services::delivery::DeliveryService;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStoreSettingsInput {
    #[validate(length(min = 1, max = 120))]
    pub store_name: Option<String>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
}

#[derive(Clone)]
pub struct SettingsService {
    db: Arc<DatabaseConnection>,
    delivery: DeliveryService,
}

impl SettingsService {
    pub fn new(db: Arc<DatabaseConnection>, delivery: DeliveryService) -> Self {
        Self { db, delivery }
    }

    pub async fn store_settings(&self) -> Result<StoreSettingsModel, ServiceError> {
        StoreSettings::find_by_id(SETTINGS_ROW_ID)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Store settings not initialized".into()))
    }

    /// Partial update; coordinates must be supplied as a pair. Every
    /// update drops the cached store coordinates and all cached fees,
    /// since both depend on the store location.
    #[instrument(skip(self, input))]
    pub async fn update_store_settings(
        &self,
        input: UpdateStoreSettingsInput,
    ) -> Result<StoreSettingsModel, ServiceError> {
        input.validate()?;
        if input.latitude.is_some() != input.longitude.is_some() {
            return Err(ServiceError::ValidationError(
                "latitude and longitude must be provided together".into(),
            ));
        }

        let current = self.store_settings().await?;
        let mut settings: store_settings::ActiveModel = current.into();

        if let Some(store_name) = input.store_name {
            settings.store_name = Set(store_name);
        }
        if let Some(address) = input.address {
            settings.address = Set(Some(address));
        }
        if input.latitude.is_some() {
            settings.latitude = Set(input.latitude);
            settings.longitude = Set(input.longitude);
        }
        settings.updated_at = Set(Utc::now());

        let updated = settings.update(&*self.db).await?;
        self.delivery.invalidate_store_coordinates();
        info!("store settings updated");
        Ok(updated)
    }
}
