//! Health and taxonomy handlers

use crate::api::rest::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use waste_types::MaterialTaxonomy;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
    pub storage: String,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
        storage: state.backend.to_string(),
    })
}

/// Material taxonomy the ledger validates against
pub async fn get_taxonomy(State(state): State<AppState>) -> Json<MaterialTaxonomy> {
    Json(state.ledger.taxonomy().clone())
}
