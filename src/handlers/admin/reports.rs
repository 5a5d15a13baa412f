//! Sales and inventory reports, served as JSON or as an xlsx download.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::auth::AdminAuth;
use crate::errors::ApiError;
use crate::handlers::common::{attachment_response, success_response};
use crate::services::reports::{
    inventory_workbook, sales_workbook, InventoryReportParams, ReportFormat, SalesReportParams,
    XLSX_CONTENT_TYPE,
};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sales", get(sales))
        .route("/inventory", get(inventory))
}

async fn sales(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
    Query(params): Query<SalesReportParams>,
) -> Result<Response, ApiError> {
    let report = state.services.reports.sales_report(&params).await?;
    if params.format == Some(ReportFormat::Xlsx) {
        let bytes = sales_workbook(&report)?;
        return Ok(attachment_response(bytes, XLSX_CONTENT_TYPE, "sales-report.xlsx"));
    }
    Ok(success_response(report).into_response())
}

async fn inventory(
    State(state): State<Arc<AppState>>,
    AdminAuth(_admin): AdminAuth,
    Query(params): Query<InventoryReportParams>,
) -> Result<Response, ApiError> {
    let report = state.services.reports.inventory_report().await?;
    if params.format == Some(ReportFormat::Xlsx) {
        let bytes = inventory_workbook(&report)?;
        return Ok(attachment_response(
            bytes,
            XLSX_CONTENT_TYPE,
            "inventory-report.xlsx",
        ));
    }
    Ok(success_response(report).into_response())
}
