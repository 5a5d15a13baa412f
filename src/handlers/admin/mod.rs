//! Administration surface, mounted under `/api/v1/admin`. Every
//! handler except login requires an admin token; customer tokens are
//! rejected by the `AdminAuth` extractor.

pub mod auth;
pub mod customers;
pub mod imports;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod reports;
pub mod settings;
pub mod uploads;

use axum::Router;
use std::sync::Arc;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/auth", auth::routes())
        .nest("/customers", customers::routes())
        .nest("/orders", orders::routes())
        .nest("/reports", reports::routes())
        .nest("/settings", settings::routes())
        .merge(products::routes())
        .merge(inventory::routes())
        .merge(imports::routes())
        .merge(uploads::routes())
}
