//! Order status transitions.
//!
//! The legal moves live in configuration, not code: `order_transitions`
//! maps each state to the states reachable from it. An update outside
//! the table is rejected with the currently-legal next states so the
//! caller can self-correct. Every accepted transition writes a history
//! row in the same transaction as the status change.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{order_status_history, Order, OrderModel, OrderStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderStatusInput {
    pub status: OrderStatus,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// Parsed adjacency table. Built once at startup so a typo in the
/// configuration fails the boot instead of the first status update.
#[derive(Debug, Clone)]
pub struct TransitionTable {
    map: HashMap<OrderStatus, Vec<OrderStatus>>,
}

impl TransitionTable {
    pub fn from_config(raw: &HashMap<String, Vec<String>>) -> Result<Self, ServiceError> {
        let mut map = HashMap::new();
        for (from, targets) in raw {
            let from: OrderStatus = from.parse().map_err(|_| {
                ServiceError::ValidationError(format!(
                    "Unknown order status '{}' in order_transitions",
                    from
                ))
            })?;
            let mut parsed = Vec::with_capacity(targets.len());
            for target in targets {
                parsed.push(target.parse().map_err(|_| {
                    ServiceError::ValidationError(format!(
                        "Unknown order status '{}' in order_transitions",
                        target
                    ))
                })?);
            }
            map.insert(from, parsed);
        }
        Ok(Self { map })
    }

    /// States reachable from `from`. Unlisted states have no exits.
    pub fn allowed_from(&self, from: OrderStatus) -> &[OrderStatus] {
        self.map.get(&from).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_allowed(&self, from: OrderStatus, to: OrderStatus) -> bool {
        self.allowed_from(from).contains(&to)
    }
}

#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    transitions: Arc<TransitionTable>,
}

impl OrderStatusService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        transitions: Arc<TransitionTable>,
    ) -> Self {
        Self {
            db,
            event_sender,
            transitions,
        }
    }

    pub fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    #[instrument(skip(self, input), fields(order_id = %order_id, actor = %actor))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        actor: &str,
        input: UpdateOrderStatusInput,
    ) -> Result<OrderModel, ServiceError> {
        input.validate()?;
        let to = input.status;

        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        let from = order.status;

        if !self.transitions.is_allowed(from, to) {
            let allowed = self
                .transitions
                .allowed_from(from)
                .iter()
                .map(|s| s.to_string())
                .collect();
            return Err(ServiceError::InvalidStatusTransition {
                from: from.to_string(),
                to: to.to_string(),
                allowed,
            });
        }

        let now = Utc::now();
        let mut active = order.into_active_model();
        active.status = Set(to);
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;

        order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            from_status: Set(Some(from)),
            to_status: Set(to),
            actor: Set(actor.to_string()),
            note: Set(input.note),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(from = %from, to = %to, "order status updated");
        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: from,
                new_status: to,
            })
            .await;

        Ok(updated)
    }
}
