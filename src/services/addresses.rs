//! Customer delivery addresses.
//!
//! At most one address per customer carries `is_default`; siblings are
//! cleared in the same transaction that sets a new default. Edits and
//! deletes drop the cached delivery fee for the touched address, since
//! a moved pin invalidates the computed distance.

use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{address, Address, AddressModel};
use crate::errors::ServiceError;
use crate::services::delivery::DeliveryService;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAddressInput {
    #[validate(length(max = 60))]
    pub label: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub street: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(max = 100))]
    pub district: Option<String>,
    #[validate(length(min = 5, max = 32))]
    pub phone: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAddressInput {
    #[validate(length(max = 60))]
    pub label: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub street: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub district: Option<String>,
    #[validate(length(min = 5, max = 32))]
    pub phone: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AddressResponse {
    pub id: Uuid,
    pub label: Option<String>,
    pub street: String,
    pub city: String,
    pub district: Option<String>,
    pub phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl From<AddressModel> for AddressResponse {
    fn from(model: AddressModel) -> Self {
        Self {
            id: model.id,
            label: model.label,
            street: model.street,
            city: model.city,
            district: model.district,
            phone: model.phone,
            latitude: model.latitude,
            longitude: model.longitude,
            is_default: model.is_default,
            created_at: model.created_at,
        }
    }
}

#[derive(Clone)]
pub struct AddressService {
    db: Arc<DatabaseConnection>,
    delivery: DeliveryService,
}

impl AddressService {
    pub fn new(db: Arc<DatabaseConnection>, delivery: DeliveryService) -> Self {
        Self { db, delivery }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, customer_id: Uuid) -> Result<Vec<AddressResponse>, ServiceError> {
        let addresses = Address::find()
            .filter(address::Column::CustomerId.eq(customer_id))
            .order_by_desc(address::Column::IsDefault)
            .order_by_desc(address::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(addresses.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, input), fields(customer_id = %customer_id))]
    pub async fn create(
        &self,
        customer_id: Uuid,
        input: CreateAddressInput,
    ) -> Result<AddressResponse, ServiceError> {
        input.validate()?;
        ensure_coordinate_pair(input.latitude, input.longitude)?;

        let existing = Address::find()
            .filter(address::Column::CustomerId.eq(customer_id))
            .count(&*self.db)
            .await?;
        // The first address becomes the default whether asked or not.
        let is_default = input.is_default || existing == 0;

        let now = Utc::now();
        let txn = self.db.begin().await?;
        if is_default && existing > 0 {
            Address::update_many()
                .col_expr(address::Column::IsDefault, Expr::value(false))
                .filter(address::Column::CustomerId.eq(customer_id))
                .exec(&txn)
                .await?;
        }
        let created = address::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            label: Set(input.label),
            street: Set(input.street),
            city: Set(input.city),
            district: Set(input.district),
            phone: Set(input.phone),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            is_default: Set(is_default),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(address_id = %created.id, "address created");
        Ok(created.into())
    }

    #[instrument(skip(self, input), fields(customer_id = %customer_id, address_id = %address_id))]
    pub async fn update(
        &self,
        customer_id: Uuid,
        address_id: Uuid,
        input: UpdateAddressInput,
    ) -> Result<AddressResponse, ServiceError> {
        input.validate()?;
        ensure_coordinate_pair(input.latitude, input.longitude)?;

        let current = self.owned(customer_id, address_id).await?;
        let make_default = input.is_default.unwrap_or(false) && !current.is_default;

        let txn = self.db.begin().await?;
        if make_default {
            Address::update_many()
                .col_expr(address::Column::IsDefault, Expr::value(false))
                .filter(address::Column::CustomerId.eq(customer_id))
                .exec(&txn)
                .await?;
        }

        let mut active = current.into_active_model();
        if let Some(label) = input.label {
            active.label = Set(Some(label));
        }
        if let Some(street) = input.street {
            active.street = Set(street);
        }
        if let Some(city) = input.city {
            active.city = Set(city);
        }
        if let Some(district) = input.district {
            active.district = Set(Some(district));
        }
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone));
        }
        if input.latitude.is_some() {
            active.latitude = Set(input.latitude);
            active.longitude = Set(input.longitude);
        }
        if let Some(is_default) = input.is_default {
            active.is_default = Set(is_default);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        // The pin may have moved; the cached fee is no longer trustworthy.
        self.delivery.invalidate_fee(address_id);
        info!("address updated");
        Ok(updated.into())
    }

    #[instrument(skip(self), fields(customer_id = %customer_id, address_id = %address_id))]
    pub async fn delete(&self, customer_id: Uuid, address_id: Uuid) -> Result<(), ServiceError> {
        let res = Address::delete_many()
            .filter(address::Column::Id.eq(address_id))
            .filter(address::Column::CustomerId.eq(customer_id))
            .exec(&*self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Address {} not found",
                address_id
            )));
        }

        self.delivery.invalidate_fee(address_id);
        info!("address deleted");
        Ok(())
    }

    async fn owned(
        &self,
        customer_id: Uuid,
        address_id: Uuid,
    ) -> Result<AddressModel, ServiceError> {
        Address::find_by_id(address_id)
            .filter(address::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Address {} not found", address_id)))
    }
}

fn ensure_coordinate_pair(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<(), ServiceError> {
    if latitude.is_some() != longitude.is_some() {
        return Err(ServiceError::ValidationError(
            "latitude and longitude must be provided together".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_come_as_a_pair_or_not_at_all() {
        assert!(ensure_coordinate_pair(None, None).is_ok());
        assert!(ensure_coordinate_pair(Some(33.5), Some(36.3)).is_ok());
        assert!(ensure_coordinate_pair(Some(33.5), None).is_err());
        assert!(ensure_coordinate_pair(None, Some(36.3)).is_err());
    }

    #[test]
    fn out_of_range_coordinates_fail_validation() {
        let input = CreateAddressInput {
            label: None,
            street: "12 Harbor Rd".into(),
            city: "Latakia".into(),
            district: None,
            phone: None,
            latitude: Some(95.0),
            longitude: Some(36.3),
            is_default: false,
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("latitude"));
    }
}
