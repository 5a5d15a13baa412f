//! Manual stock adjustments and the movement audit trail.
//!
//! The quantity update and its StockMovement row commit in the same
//! transaction, so the audit trail can never lag the stock figure. A
//! change that would take stock negative is rejected outright with
//! nothing mutated.

use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{
    product, stock_movement, Product, StockMovement, StockMovementModel, StockMovementReason,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::{normalize_page, Paginated};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdjustStockInput {
    /// Signed delta; positive receives stock, negative removes it
    pub quantity_change: i32,
    pub reason: StockMovementReason,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockAdjustment {
    pub product_id: Uuid,
    pub quantity_before: i32,
    pub quantity_after: i32,
    pub quantity_change: i32,
    pub reason: StockMovementReason,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockMovementResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity_change: i32,
    pub quantity_before: i32,
    pub quantity_after: i32,
    pub reason: StockMovementReason,
    pub order_id: Option<Uuid>,
    pub note: Option<String>,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

impl From<StockMovementModel> for StockMovementResponse {
    fn from(model: StockMovementModel) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            quantity_change: model.quantity_change,
            quantity_before: model.quantity_before,
            quantity_after: model.quantity_after,
            reason: model.reason,
            order_id: model.order_id,
            note: model.note,
            actor: model.actor,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct MovementListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input), fields(product_id = %product_id, actor = %actor))]
    pub async fn adjust_stock(
        &self,
        product_id: Uuid,
        actor: &str,
        input: AdjustStockInput,
    ) -> Result<StockAdjustment, ServiceError> {
        input.validate()?;
        let change = input.quantity_change;
        if change == 0 {
            return Err(ServiceError::ValidationError(
                "quantity_change must not be zero".into(),
            ));
        }

        let txn = self.db.begin().await?;

        let current = Product::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?
            .stock_quantity;
        if current + change < 0 {
            return Err(ServiceError::ValidationError(
                "Cannot reduce stock below 0".into(),
            ));
        }

        let now = Utc::now();

        // Same guarded-decrement shape as order placement: the predicate
        // re-checks stock inside the UPDATE for negative changes.
        let mut update = Product::update_many()
            .col_expr(
                product::Column::StockQuantity,
                Expr::col(product::Column::StockQuantity).add(change),
            )
            .col_expr(product::Column::UpdatedAt, Expr::value(now))
            .filter(product::Column::Id.eq(product_id));
        if change < 0 {
            update = update.filter(product::Column::StockQuantity.gte(-change));
        }
        let res = update.exec(&txn).await?;
        if res.rows_affected == 0 {
            txn.rollback().await?;
            return Err(ServiceError::ValidationError(
                "Cannot reduce stock below 0".into(),
            ));
        }

        let after = Product::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError("product vanished mid-transaction".into())
            })?
            .stock_quantity;
        let before = after - change;

        stock_movement::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            quantity_change: Set(change),
            quantity_before: Set(before),
            quantity_after: Set(after),
            reason: Set(input.reason),
            order_id: Set(None),
            note: Set(input.note),
            actor: Set(actor.to_string()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(%change, %after, reason = %input.reason, "stock adjusted");
        self.event_sender
            .send_or_log(Event::StockAdjusted {
                product_id,
                quantity_change: change,
                quantity_after: after,
                reason: input.reason,
            })
            .await;

        Ok(StockAdjustment {
            product_id,
            quantity_before: before,
            quantity_after: after,
            quantity_change: change,
            reason: input.reason,
        })
    }

    /// Movement history for one product, newest first
    #[instrument(skip(self))]
    pub async fn list_movements(
        &self,
        product_id: Uuid,
        params: MovementListParams,
    ) -> Result<Paginated<StockMovementResponse>, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let (page, per_page) = normalize_page(params.page, params.per_page);
        let paginator = StockMovement::find()
            .filter(stock_movement::Column::ProductId.eq(product_id))
            .order_by_desc(stock_movement::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(StockMovementResponse::from)
            .collect();

        Ok(Paginated {
            items,
            total,
            page,
            per_page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_change_is_rejected_before_touching_the_database() {
        let service = InventoryService::new(
            Arc::new(DatabaseConnection::default()),
            Arc::new(crate::events::create_event_channel(4).0),
        );
        let err = service
            .adjust_stock(
                Uuid::new_v4(),
                "admin:test",
                AdjustStockInput {
                    quantity_change: 0,
                    reason: StockMovementReason::CountCorrection,
                    note: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}
