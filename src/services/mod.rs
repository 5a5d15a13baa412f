//! Business logic. Handlers authenticate, deserialize, and translate
//! errors; everything these modules do is HTTP-agnostic.

use serde::Serialize;
use utoipa::ToSchema;

pub mod addresses;
pub mod cart;
pub mod catalog;
pub mod customers;
pub mod delivery;
pub mod imports;
pub mod inventory;
pub mod order_status;
pub mod orders;
pub mod reports;
pub mod settings;
pub mod uploads;

pub use addresses::AddressService;
pub use cart::CartService;
pub use catalog::CatalogService;
pub use customers::CustomerService;
pub use delivery::DeliveryService;
pub use imports::ImportService;
pub use inventory::InventoryService;
pub use order_status::{OrderStatusService, TransitionTable};
pub use orders::OrderService;
pub use reports::ReportsService;
pub use settings::SettingsService;
pub use uploads::UploadService;

/// Shared list envelope for paginated endpoints
#[derive(Debug, Serialize, ToSchema)]
pub struct Paginated<T: ToSchema> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Normalizes raw pagination query input: 1-based page, per_page 1..=100
pub(crate) fn normalize_page(page: Option<u64>, per_page: Option<u64>) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(20).clamp(1, 100);
    (page, per_page)
}
