//! Health endpoints: a liveness probe that always answers, a readiness
//! probe that pings the database, and a small version endpoint.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::error;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct ReadinessReport {
    pub status: HealthStatus,
    pub database: HealthStatus,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone)]
pub struct HealthState {
    db: Arc<DatabaseConnection>,
    start_time: SystemTime,
}

impl HealthState {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            start_time: SystemTime::now(),
        }
    }

    pub fn uptime(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or(Duration::from_secs(0))
            .as_secs()
    }

    pub async fn readiness(&self) -> ReadinessReport {
        let database = match self.db.ping().await {
            Ok(_) => HealthStatus::Up,
            Err(e) => {
                error!("database health check failed: {}", e);
                HealthStatus::Down
            }
        };
        ReadinessReport {
            status: database,
            database,
            uptime_seconds: self.uptime(),
            timestamp: Utc::now(),
        }
    }
}

async fn liveness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "alive": true,
            "uptime_seconds": state.uptime(),
            "timestamp": Utc::now(),
        })),
    )
}

async fn readiness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let report = state.readiness().await;
    let status_code = match report.status {
        HealthStatus::Up => StatusCode::OK,
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(report))
}

async fn version_info() -> impl IntoResponse {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "commit": option_env!("GIT_HASH").unwrap_or("unknown"),
    }))
}

/// Health router with its own state; mounted outside `/api/v1`
pub fn health_routes(db: Arc<DatabaseConnection>) -> Router {
    let state = Arc::new(HealthState::new(db));
    Router::new()
        .route("/", get(liveness))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .route("/version", get(version_info))
        .with_state(state)
}
