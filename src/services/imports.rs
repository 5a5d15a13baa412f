//! CSV product import, upserting by SKU.
//!
//! Every data row commits in its own transaction: a bad row is
//! reported with its row number and skipped, the rows around it land
//! anyway. Stock changes arriving through the import leave the same
//! movement audit rows as a manual adjustment.

use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IntoActiveModel, QueryFilter, Set, TransactionTrait,
};
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{
    product, stock_movement, Product, ProductSection, StockMovementReason,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::delivery::round_currency;

/// Hard cap on data rows per file; anything larger should go through
/// several uploads.
pub const MAX_IMPORT_ROWS: usize = 5_000;

const IMPORT_NOTE: &str = "csv import";

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportRowError {
    /// 1-based data-row number (the header line does not count)
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportOutcome {
    pub total_rows: usize,
    pub inserted: usize,
    pub updated: usize,
    pub errors: Vec<ImportRowError>,
}

/// One parsed data row. Empty cells mean "leave unchanged" for
/// existing products.
#[derive(Debug)]
struct RowPatch {
    sku: String,
    name: Option<String>,
    generic_name: Option<String>,
    description: Option<String>,
    section: Option<ProductSection>,
    wholesale_price: Option<Decimal>,
    stock_quantity: Option<i32>,
}

#[derive(Clone)]
pub struct ImportService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ImportService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, bytes), fields(actor = %actor, bytes = bytes.len()))]
    pub async fn import_products(
        &self,
        actor: &str,
        bytes: &[u8],
    ) -> Result<ImportOutcome, ServiceError> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|e| ServiceError::ValidationError(format!("Unreadable CSV header: {}", e)))?
            .clone();
        let columns = column_index(&headers);
        if !columns.contains_key("sku") {
            return Err(ServiceError::ValidationError(
                "CSV is missing required column 'sku'".into(),
            ));
        }

        // Materialized up front so an oversized file is rejected before
        // any row has committed.
        let records: Vec<_> = reader.records().collect();
        if records.len() > MAX_IMPORT_ROWS {
            return Err(ServiceError::ValidationError(format!(
                "CSV exceeds the {} row limit",
                MAX_IMPORT_ROWS
            )));
        }

        let mut outcome = ImportOutcome {
            total_rows: records.len(),
            inserted: 0,
            updated: 0,
            errors: Vec::new(),
        };

        for (index, record) in records.into_iter().enumerate() {
            let row = index + 1;

            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    outcome.errors.push(ImportRowError {
                        row,
                        message: format!("unreadable row: {}", e),
                    });
                    continue;
                }
            };

            let patch = match parse_row(&columns, &record) {
                Ok(patch) => patch,
                Err(message) => {
                    outcome.errors.push(ImportRowError { row, message });
                    continue;
                }
            };

            match self.apply_row(actor, patch).await {
                Ok(true) => outcome.inserted += 1,
                Ok(false) => outcome.updated += 1,
                Err(message) => {
                    warn!(row, %message, "import row failed");
                    outcome.errors.push(ImportRowError { row, message });
                }
            }
        }

        info!(
            total = outcome.total_rows,
            inserted = outcome.inserted,
            updated = outcome.updated,
            failed = outcome.errors.len(),
            "product import finished"
        );
        self.event_sender
            .send_or_log(Event::ProductsImported {
                created: outcome.inserted,
                updated: outcome.updated,
                skipped: outcome.errors.len(),
            })
            .await;

        Ok(outcome)
    }

    /// Returns Ok(true) for an insert, Ok(false) for an update. The
    /// row's transaction never outlives this call.
    async fn apply_row(&self, actor: &str, patch: RowPatch) -> Result<bool, String> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| format!("database error: {}", e))?;

        let existing = Product::find()
            .filter(product::Column::Sku.eq(&patch.sku))
            .one(&txn)
            .await
            .map_err(|e| format!("database error: {}", e))?;

        let inserted = match existing {
            Some(current) => {
                self.update_existing(&txn, actor, current, patch).await?;
                false
            }
            None => {
                self.insert_new(&txn, actor, patch).await?;
                true
            }
        };

        txn.commit()
            .await
            .map_err(|e| format!("database error: {}", e))?;
        Ok(inserted)
    }

    async fn update_existing(
        &self,
        txn: &DatabaseTransaction,
        actor: &str,
        current: product::Model,
        patch: RowPatch,
    ) -> Result<(), String> {
        let product_id = current.id;
        let stock_before = current.stock_quantity;
        let now = chrono::Utc::now();

        let mut active = current.into_active_model();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(generic_name) = patch.generic_name {
            active.generic_name = Set(Some(generic_name));
        }
        if let Some(description) = patch.description {
            active.description = Set(Some(description));
        }
        if let Some(section) = patch.section {
            active.section = Set(section);
        }
        if let Some(price) = patch.wholesale_price {
            active.wholesale_price = Set(round_currency(price));
        }
        if let Some(stock) = patch.stock_quantity {
            active.stock_quantity = Set(stock);
        }
        active.updated_at = Set(now);
        active
            .update(txn)
            .await
            .map_err(|e| format!("database error: {}", e))?;

        if let Some(stock_after) = patch.stock_quantity {
            if stock_after != stock_before {
                record_movement(txn, actor, product_id, stock_before, stock_after, now).await?;
            }
        }
        Ok(())
    }

    async fn insert_new(
        &self,
        txn: &DatabaseTransaction,
        actor: &str,
        patch: RowPatch,
    ) -> Result<(), String> {
        let name = patch.name.ok_or("name is required for new products")?;
        let price = patch
            .wholesale_price
            .ok_or("wholesale_price is required for new products")?;
        let stock = patch.stock_quantity.unwrap_or(0);
        let now = chrono::Utc::now();
        let product_id = Uuid::new_v4();

        product::ActiveModel {
            id: Set(product_id),
            sku: Set(patch.sku),
            name: Set(name),
            generic_name: Set(patch.generic_name),
            description: Set(patch.description),
            section: Set(patch.section.unwrap_or(ProductSection::Medicines)),
            category_id: Set(None),
            manufacturer_id: Set(None),
            wholesale_price: Set(round_currency(price)),
            stock_quantity: Set(stock),
            total_sold: Set(0),
            is_active: Set(true),
            is_visible: Set(true),
            image_key: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(|e| format!("database error: {}", e))?;

        if stock > 0 {
            record_movement(txn, actor, product_id, 0, stock, now).await?;
        }
        Ok(())
    }
}

async fn record_movement(
    txn: &DatabaseTransaction,
    actor: &str,
    product_id: Uuid,
    before: i32,
    after: i32,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<(), String> {
    stock_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        quantity_change: Set(after - before),
        quantity_before: Set(before),
        quantity_after: Set(after),
        reason: Set(StockMovementReason::CountCorrection),
        order_id: Set(None),
        note: Set(Some(IMPORT_NOTE.to_string())),
        actor: Set(actor.to_string()),
        created_at: Set(now),
    }
    .insert(txn)
    .await
    .map_err(|e| format!("database error: {}", e))?;
    Ok(())
}

fn column_index(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(index, name)| (name.trim().to_lowercase(), index))
        .collect()
}

fn cell<'r>(
    columns: &HashMap<String, usize>,
    record: &'r StringRecord,
    name: &str,
) -> Option<&'r str> {
    columns
        .get(name)
        .and_then(|&index| record.get(index))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_row(
    columns: &HashMap<String, usize>,
    record: &StringRecord,
) -> Result<RowPatch, String> {
    let sku = cell(columns, record, "sku")
        .ok_or("sku is required")?
        .to_string();

    let wholesale_price = cell(columns, record, "wholesale_price")
        .map(|value| {
            Decimal::from_str(value)
                .map_err(|_| format!("invalid wholesale_price '{}'", value))
                .and_then(|price| {
                    if price < Decimal::ZERO {
                        Err("wholesale_price must not be negative".to_string())
                    } else {
                        Ok(price)
                    }
                })
        })
        .transpose()?;

    let stock_quantity = cell(columns, record, "stock_quantity")
        .map(|value| {
            value
                .parse::<i32>()
                .map_err(|_| format!("invalid stock_quantity '{}'", value))
                .and_then(|stock| {
                    if stock < 0 {
                        Err("stock_quantity must not be negative".to_string())
                    } else {
                        Ok(stock)
                    }
                })
        })
        .transpose()?;

    let section = cell(columns, record, "section")
        .map(|value| parse_section(value).ok_or_else(|| format!("unknown section '{}'", value)))
        .transpose()?;

    Ok(RowPatch {
        sku,
        name: cell(columns, record, "name").map(str::to_string),
        generic_name: cell(columns, record, "generic_name").map(str::to_string),
        description: cell(columns, record, "description").map(str::to_string),
        section,
        wholesale_price,
        stock_quantity,
    })
}

fn parse_section(value: &str) -> Option<ProductSection> {
    match value.to_lowercase().as_str() {
        "medicines" => Some(ProductSection::Medicines),
        "surgical" => Some(ProductSection::Surgical),
        "equipment" => Some(ProductSection::Equipment),
        "spc" => Some(ProductSection::Spc),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn parse(csv: &str) -> (HashMap<String, usize>, Vec<StringRecord>) {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(csv.as_bytes());
        let columns = column_index(&reader.headers().unwrap().clone());
        let records = reader.records().map(|r| r.unwrap()).collect();
        (columns, records)
    }

    #[test]
    fn rows_parse_with_optional_cells_left_empty() {
        let (columns, records) =
            parse("sku,name,wholesale_price,stock_quantity\nAMX-500,Amoxicillin 500mg,12.50,40\nPAR-650,,,\n");
        let full = parse_row(&columns, &records[0]).unwrap();
        assert_eq!(full.sku, "AMX-500");
        assert_eq!(full.wholesale_price, Some(dec!(12.50)));
        assert_eq!(full.stock_quantity, Some(40));

        let sparse = parse_row(&columns, &records[1]).unwrap();
        assert_eq!(sparse.sku, "PAR-650");
        assert!(sparse.name.is_none());
        assert!(sparse.wholesale_price.is_none());
    }

    #[test]
    fn missing_sku_is_a_row_error() {
        let (columns, records) = parse("sku,name\n,Ibuprofen 400mg\n");
        let err = parse_row(&columns, &records[0]).unwrap_err();
        assert_eq!(err, "sku is required");
    }

    #[test]
    fn bad_numbers_are_reported_with_the_offending_value() {
        let (columns, records) =
            parse("sku,wholesale_price,stock_quantity\nAMX-500,twelve,40\nPAR-650,9.99,-3\n");
        assert_eq!(
            parse_row(&columns, &records[0]).unwrap_err(),
            "invalid wholesale_price 'twelve'"
        );
        assert_eq!(
            parse_row(&columns, &records[1]).unwrap_err(),
            "stock_quantity must not be negative"
        );
    }

    #[test]
    fn sections_parse_case_insensitively() {
        assert_eq!(parse_section("Surgical"), Some(ProductSection::Surgical));
        assert_eq!(parse_section("SPC"), Some(ProductSection::Spc));
        assert!(parse_section("apparel").is_none());
    }

    #[tokio::test]
    async fn files_without_a_sku_column_are_rejected_outright() {
        let service = ImportService::new(
            Arc::new(DatabaseConnection::default()),
            Arc::new(crate::events::create_event_channel(4).0),
        );
        let err = service
            .import_products("admin:test", b"name,price\nAmoxicillin,12.50\n")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}
