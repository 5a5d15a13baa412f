//! PharmaHub API Library
//!
//! This crate provides the core functionality for the PharmaHub wholesale
//! pharmacy backend: storefront and admin HTTP surfaces, the services
//! behind them, and the supporting infrastructure.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod notifications;
pub mod openapi;
pub mod services;
pub mod storage;
pub mod tracing;

use axum::extract::FromRef;
use axum::Router;
use std::sync::Arc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::auth::AuthService;
use crate::db::DbPool;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub auth: AuthService,
    pub services: handlers::AppServices,
}

// Lets the auth extractors pull the AuthService straight out of state.
impl FromRef<Arc<AppState>> for AuthService {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.auth.clone()
    }
}

/// The versioned API surface: public catalog, storefront (cookie or
/// bearer authenticated), and the admin routes under `/admin`.
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(handlers::products::routes())
        .merge(handlers::orders::routes())
        .nest("/auth", handlers::auth::routes())
        .nest("/cart", handlers::cart::routes())
        .nest("/addresses", handlers::addresses::routes())
        .nest("/admin", handlers::admin::routes())
}

/// Assembles the full application router around the shared state.
///
/// Layer order matters: the request id must be set before the tracing
/// span reads it, and the task-local scope must wrap the handlers so
/// error envelopes can echo the id back.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(tracing::request_id_scope))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state.clone())
        .nest("/health", health::health_routes(state.db.clone()))
}
