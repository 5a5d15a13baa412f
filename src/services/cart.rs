//! Per-customer cart with server-side revalidation.
//!
//! Every read reconciles the cart against live catalog state: rows
//! whose product vanished from sale are deleted and reported, rows
//! whose quantity outgrew stock are clamped and reported. The response
//! always reflects the post-fix state, so the client never has to
//! interpret stale lines.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{
    cart_item, CartItem, CartItemModel, Product, ProductModel, ProductSection,
};
use crate::errors::{ServiceError, StockShortage};
use crate::services::delivery::round_currency;

pub const MAX_LINE_QUANTITY: i32 = 9_999;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddCartItemInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 9999))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCartItemInput {
    #[validate(range(min = 1, max = 9999))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CartWarningCode {
    /// The line was deleted because the product left sale or stocked out
    Removed,
    /// The line's quantity was clamped down to available stock
    QuantityReduced,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartWarning {
    pub code: CartWarningCode,
    pub product_id: Uuid,
    pub product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// New quantity after a clamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub generic_name: Option<String>,
    pub sku: String,
    pub section: ProductSection,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
    pub stock_quantity: i32,
    pub image_key: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub subtotal: Decimal,
    pub warnings: Vec<CartWarning>,
}

#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Reconciled cart view; see the module docs for the fix-up rules
    #[instrument(skip(self))]
    pub async fn get_cart(&self, customer_id: Uuid) -> Result<CartView, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .find_also_related(Product)
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        let mut warnings = Vec::new();
        let mut subtotal = Decimal::ZERO;

        for (item, product) in rows {
            let Some(product) = product else {
                // Product row deleted out from under the cart.
                CartItem::delete_by_id(item.id).exec(&*self.db).await?;
                warnings.push(CartWarning {
                    code: CartWarningCode::Removed,
                    product_id: item.product_id,
                    product_name: "(no longer available)".into(),
                    reason: Some("unavailable".into()),
                    quantity: None,
                });
                continue;
            };

            if !product.is_purchasable() {
                CartItem::delete_by_id(item.id).exec(&*self.db).await?;
                warnings.push(CartWarning {
                    code: CartWarningCode::Removed,
                    product_id: product.id,
                    product_name: product.name.clone(),
                    reason: Some(removal_reason(&product).into()),
                    quantity: None,
                });
                continue;
            }

            let quantity = if item.quantity > product.stock_quantity {
                let clamped = product.stock_quantity;
                let mut model: cart_item::ActiveModel = item.clone().into();
                model.quantity = Set(clamped);
                model.updated_at = Set(Utc::now());
                model.update(&*self.db).await?;
                warnings.push(CartWarning {
                    code: CartWarningCode::QuantityReduced,
                    product_id: product.id,
                    product_name: product.name.clone(),
                    reason: None,
                    quantity: Some(clamped),
                });
                clamped
            } else {
                item.quantity
            };

            let line_total = round_currency(product.wholesale_price * Decimal::from(quantity));
            subtotal += line_total;
            items.push(CartLine {
                id: item.id,
                product_id: product.id,
                name: product.name,
                generic_name: product.generic_name,
                sku: product.sku,
                section: product.section,
                unit_price: product.wholesale_price,
                quantity,
                line_total,
                stock_quantity: product.stock_quantity,
                image_key: product.image_key,
            });
        }

        if !warnings.is_empty() {
            debug!(customer_id = %customer_id, warnings = warnings.len(), "cart reconciled");
        }

        Ok(CartView {
            items,
            subtotal: round_currency(subtotal),
            warnings,
        })
    }

    /// Upserts a (customer, product) line: quantities sum on conflict,
    /// then clamp to stock. Returns the reconciled cart.
    #[instrument(skip(self, input), fields(product_id = %input.product_id))]
    pub async fn add_item(
        &self,
        customer_id: Uuid,
        input: AddCartItemInput,
    ) -> Result<CartView, ServiceError> {
        input.validate()?;

        let product = Product::find_by_id(input.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;

        // Hidden and inactive products read as missing on this surface.
        if !product.is_active || !product.is_visible {
            return Err(ServiceError::NotFound(format!(
                "Product {} not found",
                input.product_id
            )));
        }
        if product.section == ProductSection::Spc {
            return Err(ServiceError::ValidationError(
                "This product is not available for purchase".into(),
            ));
        }
        if product.stock_quantity <= 0 {
            return Err(ServiceError::InsufficientStock(vec![StockShortage {
                product_id: product.id,
                name: product.name.clone(),
                requested: input.quantity,
                available: 0,
            }]));
        }

        let existing = CartItem::find()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .filter(cart_item::Column::ProductId.eq(input.product_id))
            .one(&*self.db)
            .await?;

        let now = Utc::now();
        match existing {
            Some(item) => {
                let summed = item.quantity.saturating_add(input.quantity);
                let quantity = summed.min(product.stock_quantity).min(MAX_LINE_QUANTITY);
                let mut model: cart_item::ActiveModel = item.into();
                model.quantity = Set(quantity);
                model.updated_at = Set(now);
                model.update(&*self.db).await?;
            }
            None => {
                let quantity = input.quantity.min(product.stock_quantity);
                cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    customer_id: Set(customer_id),
                    product_id: Set(input.product_id),
                    quantity: Set(quantity),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&*self.db)
                .await?;
            }
        }

        self.get_cart(customer_id).await
    }

    /// Sets an absolute quantity for an owned line, clamped to stock.
    /// A line whose product stocked out is deleted and reported as a
    /// conflict rather than clamped to zero.
    #[instrument(skip(self, input))]
    pub async fn update_item(
        &self,
        customer_id: Uuid,
        item_id: Uuid,
        input: UpdateCartItemInput,
    ) -> Result<CartView, ServiceError> {
        input.validate()?;

        let item = self.owned_item(customer_id, item_id).await?;
        let product = Product::find_by_id(item.product_id).one(&*self.db).await?;

        let available = match &product {
            Some(p) if p.is_purchasable() => p.stock_quantity,
            _ => 0,
        };
        if available == 0 {
            CartItem::delete_by_id(item.id).exec(&*self.db).await?;
            return Err(ServiceError::Conflict(
                "Product is no longer available; the item was removed from your cart".into(),
            ));
        }

        let quantity = input.quantity.min(available);
        let mut model: cart_item::ActiveModel = item.into();
        model.quantity = Set(quantity);
        model.updated_at = Set(Utc::now());
        model.update(&*self.db).await?;

        self.get_cart(customer_id).await
    }

    /// Deletes an owned line unconditionally
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        customer_id: Uuid,
        item_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        let res = CartItem::delete_many()
            .filter(cart_item::Column::Id.eq(item_id))
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .exec(&*self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Cart item {} not found",
                item_id
            )));
        }
        self.get_cart(customer_id).await
    }

    /// Ownership-scoped lookup; unowned rows read as missing
    async fn owned_item(
        &self,
        customer_id: Uuid,
        item_id: Uuid,
    ) -> Result<CartItemModel, ServiceError> {
        CartItem::find_by_id(item_id)
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))
    }
}

fn removal_reason(product: &ProductModel) -> &'static str {
    if !product.is_active || !product.is_visible {
        "unavailable"
    } else if product.section == ProductSection::Spc {
        "not_purchasable"
    } else {
        "out_of_stock"
    }
}
