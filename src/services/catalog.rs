//! Product catalog: storefront browsing plus admin product, category,
//! and manufacturer management.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{
    category, manufacturer, product, stock_movement, Category, CategoryModel, Manufacturer,
    ManufacturerModel, Product, ProductModel, ProductSection, StockMovementReason,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::delivery::round_currency;
use crate::services::{normalize_page, Paginated};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub generic_name: Option<String>,
    pub description: Option<String>,
    pub section: ProductSection,
    pub category_id: Option<Uuid>,
    pub manufacturer_id: Option<Uuid>,
    pub wholesale_price: Decimal,
    pub stock_quantity: i32,
    pub total_sold: i64,
    pub is_active: bool,
    pub is_visible: bool,
    pub image_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductModel> for ProductResponse {
    fn from(model: ProductModel) -> Self {
        Self {
            id: model.id,
            sku: model.sku,
            name: model.name,
            generic_name: model.generic_name,
            description: model.description,
            section: model.section,
            category_id: model.category_id,
            manufacturer_id: model.manufacturer_id,
            wholesale_price: model.wholesale_price,
            stock_quantity: model.stock_quantity,
            total_sold: model.total_sold,
            is_active: model.is_active,
            is_visible: model.is_visible,
            image_key: model.image_key,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Storefront catalog filters. Only active, visible products are ever
/// returned through this surface.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ProductListParams {
    /// Substring match over name, generic name, and SKU
    pub q: Option<String>,
    pub section: Option<ProductSection>,
    pub category_id: Option<Uuid>,
    pub manufacturer_id: Option<Uuid>,
    /// Only products with stock on hand
    pub in_stock: Option<bool>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Admin catalog filters; hidden and inactive products opt-in
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AdminProductListParams {
    pub q: Option<String>,
    pub section: Option<ProductSection>,
    pub category_id: Option<Uuid>,
    pub manufacturer_id: Option<Uuid>,
    pub include_hidden: Option<bool>,
    pub include_inactive: Option<bool>,
    /// Only products at or below the configured low-stock threshold
    pub low_stock: Option<bool>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 200))]
    pub generic_name: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub section: ProductSection,
    pub category_id: Option<Uuid>,
    pub manufacturer_id: Option<Uuid>,
    pub wholesale_price: Decimal,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default = "default_true")]
    pub is_visible: bool,
    pub image_key: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 64))]
    pub sku: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 200))]
    pub generic_name: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub section: Option<ProductSection>,
    pub category_id: Option<Uuid>,
    pub manufacturer_id: Option<Uuid>,
    pub wholesale_price: Option<Decimal>,
    pub is_active: Option<bool>,
    pub is_visible: Option<bool>,
    pub image_key: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkPriceUpdateInput {
    #[validate(length(min = 1, max = 100))]
    pub updates: Vec<PriceUpdate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PriceUpdate {
    pub id: Uuid,
    pub price: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkPriceOutcome {
    pub total: usize,
    pub updated: usize,
    pub failures: Vec<BulkPriceFailure>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkPriceFailure {
    pub product_id: Uuid,
    pub error: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    #[validate(length(min = 1, max = 80))]
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ManufacturerInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(max = 80))]
    pub country: Option<String>,
}

/// URL slug from a display name; ascii alphanumerics joined by dashes
pub fn slugify(name: &str) -> Option<String> {
    let mut slug = String::with_capacity(name.len());
    let mut prev_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash && !slug.is_empty() {
            slug.push('-');
            prev_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}

#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    low_stock_threshold: i32,
}

impl CatalogService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        low_stock_threshold: i32,
    ) -> Self {
        Self {
            db,
            event_sender,
            low_stock_threshold,
        }
    }

    /// Storefront product listing: active and visible only
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        params: ProductListParams,
    ) -> Result<Paginated<ProductResponse>, ServiceError> {
        let (page, per_page) = normalize_page(params.page, params.per_page);

        let mut query = Product::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::IsVisible.eq(true));

        if let Some(section) = params.section {
            query = query.filter(product::Column::Section.eq(section));
        }
        if let Some(category_id) = params.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(manufacturer_id) = params.manufacturer_id {
            query = query.filter(product::Column::ManufacturerId.eq(manufacturer_id));
        }
        if params.in_stock.unwrap_or(false) {
            query = query.filter(product::Column::StockQuantity.gt(0));
        }
        if let Some(q) = params.q.as_deref().filter(|q| !q.trim().is_empty()) {
            let q = q.trim();
            query = query.filter(
                Condition::any()
                    .add(product::Column::Name.contains(q))
                    .add(product::Column::GenericName.contains(q))
                    .add(product::Column::Sku.contains(q)),
            );
        }

        let paginator = query
            .order_by_asc(product::Column::Name)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(ProductResponse::from)
            .collect();

        Ok(Paginated {
            items,
            total,
            page,
            per_page,
        })
    }

    /// Storefront product detail; hidden and inactive read as missing
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductResponse, ServiceError> {
        Product::find_by_id(product_id)
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::IsVisible.eq(true))
            .one(&*self.db)
            .await?
            .map(ProductResponse::from)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    #[instrument(skip(self))]
    pub async fn admin_list_products(
        &self,
        params: AdminProductListParams,
    ) -> Result<Paginated<ProductResponse>, ServiceError> {
        let (page, per_page) = normalize_page(params.page, params.per_page);

        let mut query = Product::find();
        if !params.include_inactive.unwrap_or(false) {
            query = query.filter(product::Column::IsActive.eq(true));
        }
        if !params.include_hidden.unwrap_or(false) {
            query = query.filter(product::Column::IsVisible.eq(true));
        }
        if let Some(section) = params.section {
            query = query.filter(product::Column::Section.eq(section));
        }
        if let Some(category_id) = params.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(manufacturer_id) = params.manufacturer_id {
            query = query.filter(product::Column::ManufacturerId.eq(manufacturer_id));
        }
        if params.low_stock.unwrap_or(false) {
            query = query.filter(product::Column::StockQuantity.lte(self.low_stock_threshold));
        }
        if let Some(q) = params.q.as_deref().filter(|q| !q.trim().is_empty()) {
            let q = q.trim();
            query = query.filter(
                Condition::any()
                    .add(product::Column::Name.contains(q))
                    .add(product::Column::GenericName.contains(q))
                    .add(product::Column::Sku.contains(q)),
            );
        }

        let paginator = query
            .order_by_asc(product::Column::Name)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(ProductResponse::from)
            .collect();

        Ok(Paginated {
            items,
            total,
            page,
            per_page,
        })
    }

    pub async fn admin_get_product(&self, product_id: Uuid) -> Result<ProductResponse, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .map(ProductResponse::from)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Creates a product. Initial stock, when non-zero, gets a movement
    /// row in the same transaction so the audit trail starts at zero.
    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
        actor: String,
    ) -> Result<ProductResponse, ServiceError> {
        input.validate()?;
        if input.wholesale_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "wholesale_price must not be negative".into(),
            ));
        }
        self.ensure_unique_sku(&input.sku, None).await?;
        self.ensure_references_exist(input.category_id, input.manufacturer_id)
            .await?;

        let now = Utc::now();
        let product_id = Uuid::new_v4();
        let stock = input.stock_quantity;

        let txn = self.db.begin().await?;
        let model = product::ActiveModel {
            id: Set(product_id),
            sku: Set(input.sku),
            name: Set(input.name),
            generic_name: Set(input.generic_name),
            description: Set(input.description),
            section: Set(input.section),
            category_id: Set(input.category_id),
            manufacturer_id: Set(input.manufacturer_id),
            wholesale_price: Set(round_currency(
                input.wholesale_price,
            )),
            stock_quantity: Set(stock),
            total_sold: Set(0),
            is_active: Set(true),
            is_visible: Set(input.is_visible),
            image_key: Set(input.image_key),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        if stock > 0 {
            stock_movement::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(product_id),
                quantity_change: Set(stock),
                quantity_before: Set(0),
                quantity_after: Set(stock),
                reason: Set(StockMovementReason::CountCorrection),
                order_id: Set(None),
                note: Set(Some("initial stock".into())),
                actor: Set(actor),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;

        info!(product_id = %product_id, "product created");
        Ok(model.into())
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductResponse, ServiceError> {
        input.validate()?;
        if let Some(price) = input.wholesale_price {
            if price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "wholesale_price must not be negative".into(),
                ));
            }
        }

        let current = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        if let Some(sku) = input.sku.as_deref() {
            if sku != current.sku {
                self.ensure_unique_sku(sku, Some(product_id)).await?;
            }
        }
        self.ensure_references_exist(input.category_id, input.manufacturer_id)
            .await?;

        let mut model: product::ActiveModel = current.into();
        if let Some(sku) = input.sku {
            model.sku = Set(sku);
        }
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(generic_name) = input.generic_name {
            model.generic_name = Set(Some(generic_name));
        }
        if let Some(description) = input.description {
            model.description = Set(Some(description));
        }
        if let Some(section) = input.section {
            model.section = Set(section);
        }
        if let Some(category_id) = input.category_id {
            model.category_id = Set(Some(category_id));
        }
        if let Some(manufacturer_id) = input.manufacturer_id {
            model.manufacturer_id = Set(Some(manufacturer_id));
        }
        if let Some(price) = input.wholesale_price {
            model.wholesale_price = Set(round_currency(price));
        }
        if let Some(is_active) = input.is_active {
            model.is_active = Set(is_active);
        }
        if let Some(is_visible) = input.is_visible {
            model.is_visible = Set(is_visible);
        }
        if let Some(image_key) = input.image_key {
            model.image_key = Set(Some(image_key));
        }
        model.updated_at = Set(Utc::now());

        let updated = model.update(&*self.db).await?;
        Ok(updated.into())
    }

    /// Applies up to 100 price changes independently; failures are
    /// collected, never aborting the batch.
    #[instrument(skip(self, input), fields(total = input.updates.len()))]
    pub async fn bulk_update_prices(
        &self,
        input: BulkPriceUpdateInput,
    ) -> Result<BulkPriceOutcome, ServiceError> {
        input.validate()?;

        let total = input.updates.len();
        let mut updated = 0usize;
        let mut failures = Vec::new();

        for update in input.updates {
            if update.price < Decimal::ZERO {
                failures.push(BulkPriceFailure {
                    product_id: update.id,
                    error: "price must not be negative".into(),
                });
                continue;
            }
            let result = Product::update_many()
                .col_expr(
                    product::Column::WholesalePrice,
                    Expr::value(round_currency(update.price)),
                )
                .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(product::Column::Id.eq(update.id))
                .exec(&*self.db)
                .await;
            match result {
                Ok(res) if res.rows_affected > 0 => updated += 1,
                Ok(_) => failures.push(BulkPriceFailure {
                    product_id: update.id,
                    error: "product not found".into(),
                }),
                Err(e) => {
                    warn!(product_id = %update.id, error = %e, "price update failed");
                    failures.push(BulkPriceFailure {
                        product_id: update.id,
                        error: "database error".into(),
                    });
                }
            }
        }

        info!(total, updated, failed = failures.len(), "bulk price update finished");
        Ok(BulkPriceOutcome {
            total,
            updated,
            failures,
        })
    }

    pub async fn list_categories(&self) -> Result<Vec<CategoryModel>, ServiceError> {
        Ok(Category::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, input))]
    pub async fn create_category(&self, input: CategoryInput) -> Result<CategoryModel, ServiceError> {
        input.validate()?;
        let slug = match input.slug {
            Some(slug) => slug,
            None => slugify(&input.name).ok_or_else(|| {
                ServiceError::ValidationError(
                    "name yields an empty slug; provide one explicitly".into(),
                )
            })?,
        };
        if Category::find()
            .filter(category::Column::Slug.eq(&slug))
            .one(&*self.db)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "Category slug '{}' already exists",
                slug
            )));
        }

        let now = Utc::now();
        Ok(category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            slug: Set(slug),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?)
    }

    pub async fn update_category(
        &self,
        category_id: Uuid,
        input: CategoryInput,
    ) -> Result<CategoryModel, ServiceError> {
        input.validate()?;
        let current = Category::find_by_id(category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", category_id)))?;

        let mut model: category::ActiveModel = current.clone().into();
        if let Some(slug) = input.slug {
            if slug != current.slug {
                if Category::find()
                    .filter(category::Column::Slug.eq(&slug))
                    .one(&*self.db)
                    .await?
                    .is_some()
                {
                    return Err(ServiceError::Conflict(format!(
                        "Category slug '{}' already exists",
                        slug
                    )));
                }
                model.slug = Set(slug);
            }
        }
        model.name = Set(input.name);
        model.updated_at = Set(Utc::now());
        Ok(model.update(&*self.db).await?)
    }

    /// Deletes a category; referencing products fall back to no category
    pub async fn delete_category(&self, category_id: Uuid) -> Result<(), ServiceError> {
        let res = Category::delete_by_id(category_id).exec(&*self.db).await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Category {} not found",
                category_id
            )));
        }
        Ok(())
    }

    pub async fn list_manufacturers(&self) -> Result<Vec<ManufacturerModel>, ServiceError> {
        Ok(Manufacturer::find()
            .order_by_asc(manufacturer::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, input))]
    pub async fn create_manufacturer(
        &self,
        input: ManufacturerInput,
    ) -> Result<ManufacturerModel, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        Ok(manufacturer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            country: Set(input.country),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?)
    }

    pub async fn update_manufacturer(
        &self,
        manufacturer_id: Uuid,
        input: ManufacturerInput,
    ) -> Result<ManufacturerModel, ServiceError> {
        input.validate()?;
        let current = Manufacturer::find_by_id(manufacturer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Manufacturer {} not found", manufacturer_id))
            })?;

        let mut model: manufacturer::ActiveModel = current.into();
        model.name = Set(input.name);
        model.country = Set(input.country);
        model.updated_at = Set(Utc::now());
        Ok(model.update(&*self.db).await?)
    }

    pub async fn delete_manufacturer(&self, manufacturer_id: Uuid) -> Result<(), ServiceError> {
        let res = Manufacturer::delete_by_id(manufacturer_id)
            .exec(&*self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Manufacturer {} not found",
                manufacturer_id
            )));
        }
        Ok(())
    }

    async fn ensure_unique_sku(
        &self,
        sku: &str,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = Product::find().filter(product::Column::Sku.eq(sku));
        if let Some(id) = exclude {
            query = query.filter(product::Column::Id.ne(id));
        }
        if query.one(&*self.db).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "SKU '{}' already exists",
                sku
            )));
        }
        Ok(())
    }

    async fn ensure_references_exist(
        &self,
        category_id: Option<Uuid>,
        manufacturer_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        if let Some(id) = category_id {
            if Category::find_by_id(id).one(&*self.db).await?.is_none() {
                return Err(ServiceError::ValidationError(format!(
                    "Category {} does not exist",
                    id
                )));
            }
        }
        if let Some(id) = manufacturer_id {
            if Manufacturer::find_by_id(id).one(&*self.db).await?.is_none() {
                return Err(ServiceError::ValidationError(format!(
                    "Manufacturer {} does not exist",
                    id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Pain Relief", Some("pain-relief"); "spaces become dashes")]
    #[test_case("  Vitamins & Minerals!  ", Some("vitamins-minerals"); "punctuation collapses")]
    #[test_case("ABC123", Some("abc123"); "alphanumerics pass through")]
    #[test_case("!!!", None; "no usable characters")]
    fn slugify_cases(input: &str, expected: Option<&str>) {
        assert_eq!(slugify(input).as_deref(), expected);
    }
}
