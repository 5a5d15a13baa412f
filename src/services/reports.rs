//! Read-only reporting: sales aggregates over a date window and a
//! point-in-time inventory picture, each available as JSON or as a
//! downloadable xlsx workbook.
//!
//! Cancelled orders stay out of revenue figures but are listed in the
//! per-status breakdown, so the two views reconcile.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use sea_orm::{
    sea_query::{Alias, Expr},
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::{order, order_item, product, Order, OrderItem, OrderStatus, Product};
use crate::errors::ServiceError;
use crate::services::delivery::round_currency;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Xlsx,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SalesReportParams {
    /// Window start; defaults to 30 days before `to`
    pub from: Option<DateTime<Utc>>,
    /// Window end; defaults to now
    pub to: Option<DateTime<Utc>>,
    pub format: Option<ReportFormat>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct InventoryReportParams {
    pub format: Option<ReportFormat>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalesReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Orders placed in the window, cancelled ones excluded
    pub orders: i64,
    pub revenue: Decimal,
    pub delivery_fees: Decimal,
    pub by_status: Vec<StatusCount>,
    pub top_products: Vec<TopProduct>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub orders: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub product_name: String,
    pub units: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryReport {
    pub total_active: u64,
    pub out_of_stock: u64,
    pub low_stock_threshold: i32,
    /// Wholesale value of everything currently on the shelf
    pub stock_value: Decimal,
    pub low_stock: Vec<LowStockProduct>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LowStockProduct {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub stock_quantity: i32,
}

#[derive(Debug, FromQueryResult)]
struct StatusCountRow {
    status: OrderStatus,
    orders: i64,
}

#[derive(Debug, FromQueryResult)]
struct TopProductRow {
    product_id: Uuid,
    product_name: Option<String>,
    units: Option<i64>,
    revenue: Option<Decimal>,
}

#[derive(Clone)]
pub struct ReportsService {
    db: Arc<DatabaseConnection>,
    low_stock_threshold: i32,
}

impl ReportsService {
    pub fn new(db: Arc<DatabaseConnection>, low_stock_threshold: i32) -> Self {
        Self {
            db,
            low_stock_threshold,
        }
    }

    #[instrument(skip(self))]
    pub async fn sales_report(
        &self,
        params: &SalesReportParams,
    ) -> Result<SalesReport, ServiceError> {
        let to = params.to.unwrap_or_else(Utc::now);
        let from = params.from.unwrap_or_else(|| to - Duration::days(30));
        if from > to {
            return Err(ServiceError::ValidationError(
                "from must not be after to".into(),
            ));
        }

        let totals = Order::find()
            .select_only()
            .column_as(Expr::col((order::Entity, order::Column::Id)).count(), "orders")
            .column_as(
                Expr::col((order::Entity, order::Column::Total)).sum(),
                "revenue",
            )
            .column_as(
                Expr::col((order::Entity, order::Column::DeliveryFee)).sum(),
                "delivery_fees",
            )
            .filter(order::Column::CreatedAt.gte(from))
            .filter(order::Column::CreatedAt.lte(to))
            .filter(order::Column::Status.ne(OrderStatus::Cancelled))
            .into_tuple::<(Option<i64>, Option<Decimal>, Option<Decimal>)>()
            .one(&*self.db)
            .await?;
        let (orders, revenue, delivery_fees) = totals.unwrap_or((None, None, None));

        let by_status = Order::find()
            .select_only()
            .column(order::Column::Status)
            .column_as(Expr::col((order::Entity, order::Column::Id)).count(), "orders")
            .filter(order::Column::CreatedAt.gte(from))
            .filter(order::Column::CreatedAt.lte(to))
            .group_by(order::Column::Status)
            .into_model::<StatusCountRow>()
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|row| StatusCount {
                status: row.status,
                orders: row.orders,
            })
            .collect();

        let top_products = OrderItem::find()
            .select_only()
            .column(order_item::Column::ProductId)
            .column_as(
                Expr::col((order_item::Entity, order_item::Column::ProductName)).max(),
                "product_name",
            )
            .column_as(
                Expr::col((order_item::Entity, order_item::Column::Quantity)).sum(),
                "units",
            )
            .column_as(
                Expr::col((order_item::Entity, order_item::Column::LineTotal)).sum(),
                "revenue",
            )
            .join(JoinType::InnerJoin, order_item::Relation::Order.def())
            .filter(order::Column::CreatedAt.gte(from))
            .filter(order::Column::CreatedAt.lte(to))
            .filter(order::Column::Status.ne(OrderStatus::Cancelled))
            .group_by(order_item::Column::ProductId)
            .order_by_desc(Expr::col(Alias::new("units")))
            .limit(10)
            .into_model::<TopProductRow>()
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|row| TopProduct {
                product_id: row.product_id,
                product_name: row.product_name.unwrap_or_default(),
                units: row.units.unwrap_or(0),
                revenue: round_currency(row.revenue.unwrap_or(Decimal::ZERO)),
            })
            .collect();

        Ok(SalesReport {
            from,
            to,
            orders: orders.unwrap_or(0),
            revenue: round_currency(revenue.unwrap_or(Decimal::ZERO)),
            delivery_fees: round_currency(delivery_fees.unwrap_or(Decimal::ZERO)),
            by_status,
            top_products,
        })
    }

    #[instrument(skip(self))]
    pub async fn inventory_report(&self) -> Result<InventoryReport, ServiceError> {
        let total_active = Product::find()
            .filter(product::Column::IsActive.eq(true))
            .count(&*self.db)
            .await?;
        let out_of_stock = Product::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::StockQuantity.eq(0))
            .count(&*self.db)
            .await?;

        let stock_value = Product::find()
            .select_only()
            .column_as(
                Expr::expr(
                    Expr::col((product::Entity, product::Column::WholesalePrice))
                        .mul(Expr::col((product::Entity, product::Column::StockQuantity))),
                )
                .sum(),
                "stock_value",
            )
            .filter(product::Column::IsActive.eq(true))
            .into_tuple::<Option<Decimal>>()
            .one(&*self.db)
            .await?
            .flatten()
            .unwrap_or(Decimal::ZERO);

        let low_stock = Product::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::StockQuantity.gt(0))
            .filter(product::Column::StockQuantity.lte(self.low_stock_threshold))
            .order_by_asc(product::Column::StockQuantity)
            .limit(100)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|p| LowStockProduct {
                id: p.id,
                sku: p.sku,
                name: p.name,
                stock_quantity: p.stock_quantity,
            })
            .collect();

        Ok(InventoryReport {
            total_active,
            out_of_stock,
            low_stock_threshold: self.low_stock_threshold,
            stock_value: round_currency(stock_value),
            low_stock,
        })
    }
}

pub fn sales_workbook(report: &SalesReport) -> Result<Vec<u8>, ServiceError> {
    render_sales(report)
        .map_err(|e| ServiceError::InternalError(format!("xlsx rendering failed: {}", e)))
}

pub fn inventory_workbook(report: &InventoryReport) -> Result<Vec<u8>, ServiceError> {
    render_inventory(report)
        .map_err(|e| ServiceError::InternalError(format!("xlsx rendering failed: {}", e)))
}

fn render_sales(report: &SalesReport) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let money = Format::new().set_num_format("#,##0.00");

    let sheet = workbook.add_worksheet().set_name("Sales")?;
    sheet.write_with_format(0, 0, "Sales report", &bold)?;
    sheet.write(1, 0, "From")?;
    sheet.write(1, 1, report.from.format("%Y-%m-%d").to_string())?;
    sheet.write(2, 0, "To")?;
    sheet.write(2, 1, report.to.format("%Y-%m-%d").to_string())?;
    sheet.write(3, 0, "Orders")?;
    sheet.write(3, 1, report.orders as f64)?;
    sheet.write(4, 0, "Revenue")?;
    sheet.write_with_format(4, 1, report.revenue.to_f64().unwrap_or(0.0), &money)?;
    sheet.write(5, 0, "Delivery fees")?;
    sheet.write_with_format(5, 1, report.delivery_fees.to_f64().unwrap_or(0.0), &money)?;

    sheet.write_with_format(7, 0, "Status", &bold)?;
    sheet.write_with_format(7, 1, "Orders", &bold)?;
    for (offset, row) in report.by_status.iter().enumerate() {
        let line = 8 + offset as u32;
        sheet.write(line, 0, row.status.to_string())?;
        sheet.write(line, 1, row.orders as f64)?;
    }

    let sheet = workbook.add_worksheet().set_name("Top products")?;
    for (column, header) in ["Product", "Units", "Revenue"].iter().enumerate() {
        sheet.write_with_format(0, column as u16, *header, &bold)?;
    }
    for (offset, row) in report.top_products.iter().enumerate() {
        let line = 1 + offset as u32;
        sheet.write(line, 0, row.product_name.as_str())?;
        sheet.write(line, 1, row.units as f64)?;
        sheet.write_with_format(line, 2, row.revenue.to_f64().unwrap_or(0.0), &money)?;
    }

    workbook.save_to_buffer()
}

fn render_inventory(report: &InventoryReport) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let money = Format::new().set_num_format("#,##0.00");

    let sheet = workbook.add_worksheet().set_name("Inventory")?;
    sheet.write_with_format(0, 0, "Inventory report", &bold)?;
    sheet.write(1, 0, "Active products")?;
    sheet.write(1, 1, report.total_active as f64)?;
    sheet.write(2, 0, "Out of stock")?;
    sheet.write(2, 1, report.out_of_stock as f64)?;
    sheet.write(3, 0, "Stock value")?;
    sheet.write_with_format(3, 1, report.stock_value.to_f64().unwrap_or(0.0), &money)?;

    sheet.write_with_format(
        5,
        0,
        format!("Low stock (at most {} units)", report.low_stock_threshold),
        &bold,
    )?;
    for (column, header) in ["SKU", "Name", "Stock"].iter().enumerate() {
        sheet.write_with_format(6, column as u16, *header, &bold)?;
    }
    for (offset, row) in report.low_stock.iter().enumerate() {
        let line = 7 + offset as u32;
        sheet.write(line, 0, row.sku.as_str())?;
        sheet.write(line, 1, row.name.as_str())?;
        sheet.write(line, 2, row.stock_quantity as f64)?;
    }

    workbook.save_to_buffer()
}
