//! HTTP surface. Handlers authenticate via the extractors in
//! `crate::auth`, validate and deserialize input, call into the
//! service layer, and translate errors into the canonical envelope.

pub mod addresses;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod common;
pub mod orders;
pub mod products;

use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::services::{
    AddressService, CartService, CatalogService, CustomerService, DeliveryService, ImportService,
    InventoryService, OrderService, OrderStatusService, ReportsService, SettingsService,
    TransitionTable, UploadService,
};
use crate::storage::ObjectStorage;

/// Services layer container handed to every handler through `AppState`
#[derive(Clone)]
pub struct AppServices {
    pub customers: CustomerService,
    pub catalog: CatalogService,
    pub cart: CartService,
    pub addresses: AddressService,
    pub delivery: DeliveryService,
    pub orders: OrderService,
    pub order_status: OrderStatusService,
    pub inventory: InventoryService,
    pub imports: ImportService,
    pub reports: ReportsService,
    pub settings: SettingsService,
    pub uploads: UploadService,
}

impl AppServices {
    /// Wires every service against the shared pool. Fails when the
    /// configured transition table names an unknown status.
    pub fn build(
        db: Arc<DbPool>,
        config: &AppConfig,
        auth: AuthService,
        event_sender: Arc<EventSender>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Result<Self, ServiceError> {
        let transitions = Arc::new(TransitionTable::from_config(&config.order_transitions)?);
        let delivery = DeliveryService::new(db.clone(), config);

        Ok(Self {
            customers: CustomerService::new(db.clone(), auth, event_sender.clone()),
            catalog: CatalogService::new(
                db.clone(),
                event_sender.clone(),
                config.low_stock_threshold,
            ),
            cart: CartService::new(db.clone()),
            addresses: AddressService::new(db.clone(), delivery.clone()),
            orders: OrderService::new(db.clone(), event_sender.clone(), delivery.clone()),
            order_status: OrderStatusService::new(db.clone(), event_sender.clone(), transitions),
            inventory: InventoryService::new(db.clone(), event_sender.clone()),
            imports: ImportService::new(db.clone(), event_sender),
            reports: ReportsService::new(db.clone(), config.low_stock_threshold),
            settings: SettingsService::new(db, delivery.clone()),
            uploads: UploadService::new(storage, &config.uploads),
            delivery,
        })
    }
}
