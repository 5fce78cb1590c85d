//! Monthly lifecycle handlers

use crate::api::rest::extract::{ApiJson, ApiPath};
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{extract::State, Json};
use serde::Deserialize;
use waste_types::{month_from_number, MonthlySummary, OfficialDeviationRecord, TenantId};

/// Close month request
#[derive(Debug, Deserialize)]
pub struct CloseMonthRequest {
    pub closed_by: String,
}

/// Current view of a month, created OPEN on first read
pub async fn get_monthly_summary(
    State(state): State<AppState>,
    ApiPath((tenant, year, month)): ApiPath<(String, i32, i64)>,
) -> ApiResult<Json<MonthlySummary>> {
    let month = month_from_number(month)?;
    let summary = state
        .ledger
        .get_monthly_summary(&TenantId::new(tenant), year, month)
        .await?;
    Ok(Json(summary))
}

/// OPEN → CLOSED
pub async fn close_month(
    State(state): State<AppState>,
    ApiPath((tenant, year, month)): ApiPath<(String, i32, i64)>,
    ApiJson(request): ApiJson<CloseMonthRequest>,
) -> ApiResult<Json<MonthlySummary>> {
    let month = month_from_number(month)?;
    let summary = state
        .ledger
        .close_month(&TenantId::new(tenant), year, month, &request.closed_by)
        .await?;
    Ok(Json(summary))
}

/// CLOSED → TRANSFERRED; replays return the stored record
pub async fn transfer_month(
    State(state): State<AppState>,
    ApiPath((tenant, year, month)): ApiPath<(String, i32, i64)>,
) -> ApiResult<Json<OfficialDeviationRecord>> {
    let month = month_from_number(month)?;
    let record = state
        .ledger
        .transfer_month(&TenantId::new(tenant), year, month)
        .await?;
    Ok(Json(record))
}
