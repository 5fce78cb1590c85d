//! Official records handlers

use crate::api::rest::extract::ApiPath;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{extract::State, Json};
use serde::Serialize;
use waste_types::{month_from_number, OfficialDeviationRecord, TenantId};

/// Verification response
#[derive(Debug, Serialize)]
pub struct VerifyRecordResponse {
    pub verified: bool,
    pub record: OfficialDeviationRecord,
}

/// A year's official records ordered by month
pub async fn list_official_records(
    State(state): State<AppState>,
    ApiPath((tenant, year)): ApiPath<(String, i32)>,
) -> ApiResult<Json<Vec<OfficialDeviationRecord>>> {
    let records = state
        .ledger
        .list_official_records(&TenantId::new(tenant), year)
        .await?;
    Ok(Json(records))
}

/// One official record
pub async fn get_official_record(
    State(state): State<AppState>,
    ApiPath((tenant, year, month)): ApiPath<(String, i32, i64)>,
) -> ApiResult<Json<OfficialDeviationRecord>> {
    let month = month_from_number(month)?;
    let record = state
        .ledger
        .get_official_record(&TenantId::new(tenant), year, month)
        .await?;
    Ok(Json(record))
}

/// Recompute a record's hash and diversion index
pub async fn verify_official_record(
    State(state): State<AppState>,
    ApiPath((tenant, year, month)): ApiPath<(String, i32, i64)>,
) -> ApiResult<Json<VerifyRecordResponse>> {
    let month = month_from_number(month)?;
    let record = state
        .ledger
        .verify_official_record(&TenantId::new(tenant), year, month)
        .await?;
    Ok(Json(VerifyRecordResponse {
        verified: true,
        record,
    }))
}
