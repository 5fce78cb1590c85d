//! Daily entry handlers

use crate::api::rest::extract::{ApiJson, ApiPath};
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use waste_types::{month_from_number, CategoryTotals, DailyWasteEntry, NewDailyEntry, TenantId};

/// Daily totals response
#[derive(Debug, Serialize)]
pub struct DailyTotalsResponse {
    pub date: NaiveDate,
    pub totals: CategoryTotals,
    pub total: f64,
}

/// Record one daily observation
pub async fn record_entry(
    State(state): State<AppState>,
    ApiPath(tenant): ApiPath<String>,
    ApiJson(entry): ApiJson<NewDailyEntry>,
) -> ApiResult<(StatusCode, Json<DailyWasteEntry>)> {
    let recorded = state
        .ledger
        .record_daily_entry(&TenantId::new(tenant), entry)
        .await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

/// Per-category totals for one UTC calendar day
pub async fn get_daily_totals(
    State(state): State<AppState>,
    ApiPath((tenant, date)): ApiPath<(String, NaiveDate)>,
) -> ApiResult<Json<DailyTotalsResponse>> {
    let totals = state
        .ledger
        .daily_totals(&TenantId::new(tenant), date)
        .await?;
    Ok(Json(DailyTotalsResponse {
        date,
        total: totals.total(),
        totals,
    }))
}

/// Every entry of a tenant-month
pub async fn list_monthly_entries(
    State(state): State<AppState>,
    ApiPath((tenant, year, month)): ApiPath<(String, i32, i64)>,
) -> ApiResult<Json<Vec<DailyWasteEntry>>> {
    let month = month_from_number(month)?;
    let entries = state
        .ledger
        .monthly_entries(&TenantId::new(tenant), year, month)
        .await?;
    Ok(Json(entries))
}
