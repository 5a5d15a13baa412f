//! Order placement and order reads.
//!
//! Placement is one database transaction: header, snapshot items,
//! guarded stock decrements, movement audit rows, the creation history
//! row, and the cart purge all commit together or not at all. The
//! decrement predicate re-checks stock inside the UPDATE, so two
//! concurrent checkouts can never drive a product negative; the loser
//! gets the itemized stock conflict.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::{
    address, cart_item, order, order_item, order_status_history, product, stock_movement, Address,
    CartItem, Customer, DeliveryMethod, Order, OrderItem, OrderItemModel, OrderModel, OrderStatus,
    OrderStatusHistory, OrderStatusHistoryModel, PaymentMethod, PaymentStatus, Product,
    StockMovementReason,
};
use crate::errors::{ServiceError, StockShortage};
use crate::events::{Event, EventSender};
use crate::services::delivery::{round_currency, DeliveryService};
use crate::services::{normalize_page, Paginated};

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderInput {
    pub delivery_method: DeliveryMethod,
    pub payment_method: PaymentMethod,
    /// Required for standard and express delivery
    pub address_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub delivery_method: DeliveryMethod,
    pub payment_method: PaymentMethod,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub delivery_address: Option<String>,
    pub delivery_fee_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderModel> for OrderResponse {
    fn from(model: OrderModel) -> Self {
        Self {
            id: model.id,
            order_number: model.order_number,
            customer_id: model.customer_id,
            status: model.status,
            payment_status: model.payment_status,
            delivery_method: model.delivery_method,
            payment_method: model.payment_method,
            subtotal: model.subtotal,
            delivery_fee: model.delivery_fee,
            total: model.total,
            delivery_address: model.delivery_address,
            delivery_fee_note: model.delivery_fee_note,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub product_name: String,
    pub generic_name: Option<String>,
    pub sku: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

impl From<OrderItemModel> for OrderItemResponse {
    fn from(model: OrderItemModel) -> Self {
        Self {
            product_id: model.product_id,
            product_name: model.product_name,
            generic_name: model.generic_name,
            sku: model.sku,
            unit_price: model.unit_price,
            quantity: model.quantity,
            line_total: model.line_total,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderHistoryEntry {
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
    pub actor: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<OrderStatusHistoryModel> for OrderHistoryEntry {
    fn from(model: OrderStatusHistoryModel) -> Self {
        Self {
            from_status: model.from_status,
            to_status: model.to_status,
            actor: model.actor,
            note: model.note,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub items: Vec<OrderItemResponse>,
    pub history: Vec<OrderHistoryEntry>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct OrderListParams {
    pub status: Option<OrderStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AdminOrderListParams {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<Uuid>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    delivery: DeliveryService,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        delivery: DeliveryService,
    ) -> Self {
        Self {
            db,
            event_sender,
            delivery,
        }
    }

    /// The checkout submission. See the module docs for the
    /// transaction layout.
    #[instrument(skip(self, input), fields(customer_id = %customer_id))]
    pub async fn place_order(
        &self,
        customer_id: Uuid,
        input: PlaceOrderInput,
    ) -> Result<OrderDetail, ServiceError> {
        let customer = Customer::find_by_id(customer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Customer not found".into()))?;
        if !customer.can_order() {
            return Err(ServiceError::InvalidOperation(
                "Your account must be approved before placing orders".into(),
            ));
        }

        let address = match input.delivery_method {
            DeliveryMethod::Pickup => None,
            DeliveryMethod::Standard | DeliveryMethod::Express => {
                let address_id = input.address_id.ok_or_else(|| {
                    ServiceError::ValidationError(
                        "address_id is required for this delivery method".into(),
                    )
                })?;
                Some(
                    Address::find_by_id(address_id)
                        .filter(address::Column::CustomerId.eq(customer_id))
                        .one(&*self.db)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Address {} not found", address_id))
                        })?,
                )
            }
        };

        // Cart joined with live products; lines that left sale are dropped.
        let lines: Vec<_> = CartItem::find()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .find_also_related(Product)
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&*self.db)
            .await?
            .into_iter()
            .filter_map(|(item, product)| {
                product
                    .filter(|p| p.is_purchasable())
                    .map(|p| (item.quantity, p))
            })
            .collect();
        if lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "Cart is empty or all items are unavailable".into(),
            ));
        }

        // Full itemized diff before touching anything.
        let shortages: Vec<StockShortage> = lines
            .iter()
            .filter(|(quantity, p)| *quantity > p.stock_quantity)
            .map(|(quantity, p)| StockShortage {
                product_id: p.id,
                name: p.name.clone(),
                requested: *quantity,
                available: p.stock_quantity,
            })
            .collect();
        if !shortages.is_empty() {
            return Err(ServiceError::InsufficientStock(shortages));
        }

        let quote = self
            .delivery
            .quote_for(input.delivery_method, address.as_ref())
            .await?;
        let subtotal = round_currency(
            lines
                .iter()
                .map(|(quantity, p)| {
                    round_currency(p.wholesale_price * Decimal::from(*quantity))
                })
                .sum::<Decimal>(),
        );
        let delivery_fee = quote.fee;
        let total = round_currency(subtotal + delivery_fee);

        let order_id = Uuid::new_v4();
        let order_number = generate_order_number();
        let now = Utc::now();
        let actor = format!("customer:{}", customer_id);

        let txn = self.db.begin().await?;

        let header = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number.clone()),
            customer_id: Set(customer_id),
            status: Set(OrderStatus::New),
            payment_status: Set(PaymentStatus::Pending),
            delivery_method: Set(input.delivery_method),
            payment_method: Set(input.payment_method),
            subtotal: Set(subtotal),
            delivery_fee: Set(delivery_fee),
            total: Set(total),
            delivery_address_id: Set(address.as_ref().map(|a| a.id)),
            delivery_address: Set(address.as_ref().map(|a| a.flattened())),
            delivery_fee_note: Set(quote.note.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for (quantity, product) in &lines {
            let quantity = *quantity;

            // The predicate is the authoritative stock check.
            let res = Product::update_many()
                .col_expr(
                    product::Column::StockQuantity,
                    Expr::col(product::Column::StockQuantity).sub(quantity),
                )
                .col_expr(
                    product::Column::TotalSold,
                    Expr::col(product::Column::TotalSold).add(quantity as i64),
                )
                .col_expr(product::Column::UpdatedAt, Expr::value(now))
                .filter(product::Column::Id.eq(product.id))
                .filter(product::Column::StockQuantity.gte(quantity))
                .exec(&txn)
                .await?;
            if res.rows_affected == 0 {
                // A concurrent order won; answer with live availability.
                let available = Product::find_by_id(product.id)
                    .one(&txn)
                    .await?
                    .map(|p| p.stock_quantity)
                    .unwrap_or(0);
                txn.rollback().await?;
                return Err(ServiceError::InsufficientStock(vec![StockShortage {
                    product_id: product.id,
                    name: product.name.clone(),
                    requested: quantity,
                    available,
                }]));
            }

            let after = Product::find_by_id(product.id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::InternalError("product vanished mid-transaction".into())
                })?
                .stock_quantity;

            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                product_name: Set(product.name.clone()),
                generic_name: Set(product.generic_name.clone()),
                sku: Set(product.sku.clone()),
                unit_price: Set(product.wholesale_price),
                quantity: Set(quantity),
                line_total: Set(round_currency(
                    product.wholesale_price * Decimal::from(quantity),
                )),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;

            stock_movement::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(product.id),
                quantity_change: Set(-quantity),
                quantity_before: Set(after + quantity),
                quantity_after: Set(after),
                reason: Set(StockMovementReason::Sale),
                order_id: Set(Some(order_id)),
                note: Set(None),
                actor: Set(actor.clone()),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            from_status: Set(None),
            to_status: Set(OrderStatus::New),
            actor: Set(actor),
            note: Set(None),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        CartItem::delete_many()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!(order_id = %order_id, order_number = %order_number, %total, "order placed");
        self.event_sender
            .send_or_log(Event::OrderPlaced { order_id })
            .await;

        self.load_detail(header).await
    }

    #[instrument(skip(self))]
    pub async fn list_for_customer(
        &self,
        customer_id: Uuid,
        params: OrderListParams,
    ) -> Result<Paginated<OrderResponse>, ServiceError> {
        let (page, per_page) = normalize_page(params.page, params.per_page);

        let mut query = Order::find().filter(order::Column::CustomerId.eq(customer_id));
        if let Some(status) = params.status {
            query = query.filter(order::Column::Status.eq(status));
        }

        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(OrderResponse::from)
            .collect();

        Ok(Paginated {
            items,
            total,
            page,
            per_page,
        })
    }

    /// Own-order detail; other customers' orders read as missing
    pub async fn get_for_customer(
        &self,
        customer_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderDetail, ServiceError> {
        let order = Order::find_by_id(order_id)
            .filter(order::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        self.load_detail(order).await
    }

    #[instrument(skip(self))]
    pub async fn admin_list(
        &self,
        params: AdminOrderListParams,
    ) -> Result<Paginated<OrderResponse>, ServiceError> {
        let (page, per_page) = normalize_page(params.page, params.per_page);

        let mut query = Order::find();
        if let Some(status) = params.status {
            query = query.filter(order::Column::Status.eq(status));
        }
        if let Some(customer_id) = params.customer_id {
            query = query.filter(order::Column::CustomerId.eq(customer_id));
        }

        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(OrderResponse::from)
            .collect();

        Ok(Paginated {
            items,
            total,
            page,
            per_page,
        })
    }

    pub async fn admin_get(&self, order_id: Uuid) -> Result<OrderDetail, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        self.load_detail(order).await
    }

    async fn load_detail(&self, order: OrderModel) -> Result<OrderDetail, ServiceError> {
        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&*self.db)
            .await?;
        let history = OrderStatusHistory::find()
            .filter(order_status_history::Column::OrderId.eq(order.id))
            .order_by_asc(order_status_history::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(OrderDetail {
            order: order.into(),
            items: items.into_iter().map(Into::into).collect(),
            history: history.into_iter().map(Into::into).collect(),
        })
    }
}

/// Date-stamped order number with a random suffix. The alphabet skips
/// the lookalikes I, L, O, and U.
fn generate_order_number() -> String {
    const ALPHABET: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("ORD-{}-{}", Utc::now().format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_have_the_expected_shape() {
        let number = generate_order_number();
        assert!(number.starts_with("ORD-"));
        // ORD- + 8 date digits + dash + 6 suffix chars
        assert_eq!(number.len(), 4 + 8 + 1 + 6);
        let suffix = number.rsplit('-').next().unwrap();
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(!suffix.contains('I') && !suffix.contains('O'));
    }

    #[test]
    fn order_numbers_are_distinct() {
        let a = generate_order_number();
        let b = generate_order_number();
        // Not a guarantee, but a collision here is a 1-in-a-billion event.
        assert_ne!(a, b);
    }
}
