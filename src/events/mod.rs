use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::entities::{
    self, Customer, CustomerStatus, Order, OrderItem, OrderStatus, Product, StockMovementReason,
};
use crate::notifications::{self, EmailClient};
use crate::storage::ObjectStorage;

/// Domain events emitted by the services after their transaction has
/// committed. Handlers run on a separate task; nothing in here can
/// fail a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CustomerRegistered {
        customer_id: Uuid,
    },
    CustomerStatusChanged {
        customer_id: Uuid,
        old_status: CustomerStatus,
        new_status: CustomerStatus,
    },
    OrderPlaced {
        order_id: Uuid,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    StockAdjusted {
        product_id: Uuid,
        quantity_change: i32,
        quantity_after: i32,
        reason: StockMovementReason,
    },
    ProductsImported {
        created: usize,
        updated: usize,
        skipped: usize,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, failing if the channel is closed or full past
    /// its backlog.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event and downgrades any failure to a log line. The
    /// emitting request has already committed, so a lost event must
    /// not turn into an error response.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event.clone()).await {
            warn!("Dropping event {:?}: {}", event, e);
        }
    }
}

pub fn create_event_channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Shared handles the event loop needs to act on events
#[derive(Clone)]
pub struct EventContext {
    pub db: Arc<DatabaseConnection>,
    pub storage: Arc<dyn ObjectStorage>,
    pub email: Arc<dyn EmailClient>,
    pub low_stock_threshold: i32,
}

/// Drains the event channel until every sender is dropped
pub async fn process_events(mut rx: mpsc::Receiver<Event>, ctx: EventContext) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::OrderPlaced { order_id } => {
                if let Err(e) = handle_order_placed(&ctx, order_id).await {
                    error!(
                        "Failed to handle order placed event: order_id={}, error={}",
                        order_id, e
                    );
                }
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                if let Err(e) =
                    handle_order_status_changed(&ctx, order_id, old_status, new_status).await
                {
                    error!(
                        "Failed to handle order status change: order_id={}, error={}",
                        order_id, e
                    );
                }
            }
            Event::CustomerRegistered { customer_id } => {
                info!(%customer_id, "customer registered, awaiting verification");
            }
            Event::CustomerStatusChanged {
                customer_id,
                old_status,
                new_status,
            } => {
                if let Err(e) =
                    handle_customer_status_changed(&ctx, customer_id, old_status, new_status).await
                {
                    error!(
                        "Failed to handle customer status change: customer_id={}, error={}",
                        customer_id, e
                    );
                }
            }
            Event::StockAdjusted {
                product_id,
                quantity_change,
                quantity_after,
                reason,
            } => {
                handle_stock_adjusted(&ctx, product_id, quantity_change, quantity_after, reason)
                    .await;
            }
            Event::ProductsImported {
                created,
                updated,
                skipped,
            } => {
                info!(created, updated, skipped, "product import finished");
            }
        }
    }

    warn!("Event processing loop has ended");
}

/// Renders and stores the invoice, then emails the order confirmation
async fn handle_order_placed(ctx: &EventContext, order_id: Uuid) -> Result<(), String> {
    let order = Order::find_by_id(order_id)
        .one(ctx.db.as_ref())
        .await
        .map_err(|e| format!("loading order: {}", e))?
        .ok_or_else(|| format!("order {} not found", order_id))?;
    let items = OrderItem::find()
        .filter(entities::order_item::Column::OrderId.eq(order_id))
        .all(ctx.db.as_ref())
        .await
        .map_err(|e| format!("loading order items: {}", e))?;
    let customer = Customer::find_by_id(order.customer_id)
        .one(ctx.db.as_ref())
        .await
        .map_err(|e| format!("loading customer: {}", e))?
        .ok_or_else(|| format!("customer {} not found", order.customer_id))?;

    let invoice = notifications::render_invoice(&order, &items, &customer);
    let key = notifications::invoice_key(&order.order_number);
    ctx.storage
        .put(&key, invoice.into_bytes(), "text/plain; charset=utf-8")
        .await
        .map_err(|e| format!("storing invoice: {}", e))?;

    ctx.email
        .send(notifications::order_confirmation(&order, &customer))
        .await
        .map_err(|e| format!("sending confirmation: {}", e))?;

    info!(order_number = %order.order_number, "invoice stored, confirmation sent");
    Ok(())
}

async fn handle_order_status_changed(
    ctx: &EventContext,
    order_id: Uuid,
    old_status: OrderStatus,
    new_status: OrderStatus,
) -> Result<(), String> {
    let order = Order::find_by_id(order_id)
        .one(ctx.db.as_ref())
        .await
        .map_err(|e| format!("loading order: {}", e))?
        .ok_or_else(|| format!("order {} not found", order_id))?;
    let customer = Customer::find_by_id(order.customer_id)
        .one(ctx.db.as_ref())
        .await
        .map_err(|e| format!("loading customer: {}", e))?
        .ok_or_else(|| format!("customer {} not found", order.customer_id))?;

    info!(
        order_number = %order.order_number,
        from = %old_status,
        to = %new_status,
        "order status changed"
    );
    ctx.email
        .send(notifications::EmailMessage {
            to: customer.email.clone(),
            subject: format!("Order {} is now {}", order.order_number, new_status),
            body: format!(
                "Hello {},\n\nyour order {} moved from {} to {}.\n",
                customer.contact_name, order.order_number, old_status, new_status
            ),
        })
        .await
        .map_err(|e| format!("sending status update: {}", e))?;
    Ok(())
}

/// Emails the customer when their account is approved; other
/// transitions are only logged.
async fn handle_customer_status_changed(
    ctx: &EventContext,
    customer_id: Uuid,
    old_status: CustomerStatus,
    new_status: CustomerStatus,
) -> Result<(), String> {
    info!(
        %customer_id,
        ?old_status,
        ?new_status,
        "customer status changed"
    );
    if new_status != CustomerStatus::Approved {
        return Ok(());
    }

    let customer = Customer::find_by_id(customer_id)
        .one(ctx.db.as_ref())
        .await
        .map_err(|e| format!("loading customer: {}", e))?
        .ok_or_else(|| format!("customer {} not found", customer_id))?;
    ctx.email
        .send(notifications::EmailMessage {
            to: customer.email.clone(),
            subject: "Your wholesale account has been approved".into(),
            body: format!(
                "Hello {},\n\nyour account for {} is approved. You can now sign in and place orders.\n",
                customer.contact_name, customer.pharmacy_name
            ),
        })
        .await
        .map_err(|e| format!("sending approval notice: {}", e))?;
    Ok(())
}

async fn handle_stock_adjusted(
    ctx: &EventContext,
    product_id: Uuid,
    quantity_change: i32,
    quantity_after: i32,
    reason: StockMovementReason,
) {
    info!(
        %product_id,
        quantity_change,
        quantity_after,
        ?reason,
        "stock adjusted"
    );
    if quantity_after > ctx.low_stock_threshold {
        return;
    }
    // Attach the SKU when we can; the warning is still useful without it.
    let sku = Product::find_by_id(product_id)
        .one(ctx.db.as_ref())
        .await
        .ok()
        .flatten()
        .map(|p| p.sku);
    warn!(
        %product_id,
        sku = sku.as_deref().unwrap_or("?"),
        quantity_after,
        "product at or below low-stock threshold"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (sender, rx) = create_event_channel(4);
        drop(rx);
        // Must not panic or return an error path to the caller.
        sender
            .send_or_log(Event::CustomerRegistered {
                customer_id: Uuid::new_v4(),
            })
            .await;
    }

    #[tokio::test]
    async fn events_arrive_in_order() {
        let (sender, mut rx) = create_event_channel(4);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        sender
            .send(Event::OrderPlaced { order_id: first })
            .await
            .unwrap();
        sender
            .send(Event::OrderPlaced { order_id: second })
            .await
            .unwrap();
        match rx.recv().await {
            Some(Event::OrderPlaced { order_id }) => assert_eq!(order_id, first),
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.recv().await {
            Some(Event::OrderPlaced { order_id }) => assert_eq!(order_id, second),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
