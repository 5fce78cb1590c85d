//! Annual matrix handlers

use crate::api::rest::extract::{ApiJson, ApiPath};
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use waste_ledger::MatrixTotals;
use waste_types::{CellEdit, TenantId, YearMatrix};

/// Batch upsert request
#[derive(Debug, Deserialize)]
pub struct BatchUpsertRequest {
    pub edits: Vec<CellEdit>,
}

/// Matrix write response
#[derive(Debug, Serialize)]
pub struct UpsertResponse {
    /// Distinct cells written
    pub applied: usize,
}

/// All stored cells of a tenant-year plus the taxonomy
pub async fn get_year_matrix(
    State(state): State<AppState>,
    ApiPath((tenant, year)): ApiPath<(String, i32)>,
) -> ApiResult<Json<YearMatrix>> {
    let matrix = state
        .ledger
        .get_year_matrix(&TenantId::new(tenant), year)
        .await?;
    Ok(Json(matrix))
}

/// Row, column and grand totals plus the diversion index
pub async fn get_matrix_totals(
    State(state): State<AppState>,
    ApiPath((tenant, year)): ApiPath<(String, i32)>,
) -> ApiResult<Json<MatrixTotals>> {
    let totals = state
        .ledger
        .matrix_totals(&TenantId::new(tenant), year)
        .await?;
    Ok(Json(totals))
}

/// Apply a batch of edits all-or-nothing
pub async fn batch_upsert(
    State(state): State<AppState>,
    ApiPath((tenant, year)): ApiPath<(String, i32)>,
    ApiJson(request): ApiJson<BatchUpsertRequest>,
) -> ApiResult<Json<UpsertResponse>> {
    let applied = state
        .ledger
        .batch_upsert(&TenantId::new(tenant), year, request.edits)
        .await?;
    Ok(Json(UpsertResponse { applied }))
}

/// Replace a single cell
pub async fn upsert_cell(
    State(state): State<AppState>,
    ApiPath((tenant, year)): ApiPath<(String, i32)>,
    ApiJson(edit): ApiJson<CellEdit>,
) -> ApiResult<Json<UpsertResponse>> {
    state
        .ledger
        .upsert_cell(&TenantId::new(tenant), year, edit)
        .await?;
    Ok(Json(UpsertResponse { applied: 1 }))
}
