//! Error types for waste-daemon

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use waste_ledger::{BatchValidationReport, LedgerError};
use waste_storage::StorageError;
use waste_types::ValidationError;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed path, query parameter or request body
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Ledger rejected or failed the operation
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        ApiError::Ledger(LedgerError::Validation(value))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

fn validation_code(err: &ValidationError) -> &'static str {
    match err {
        ValidationError::InvalidMaterial { .. } => "INVALID_MATERIAL",
        ValidationError::InvalidWeight { .. } => "INVALID_WEIGHT",
        ValidationError::InvalidMonth(_) => "INVALID_MONTH",
        ValidationError::InvalidYear(_) => "INVALID_YEAR",
        ValidationError::InvalidCategory(_) => "INVALID_CATEGORY",
        ValidationError::InvalidStatus(_)
        | ValidationError::InvalidTaxonomy(_)
        | ValidationError::MissingField(_) => "VALIDATION_ERROR",
    }
}

fn batch_details(report: &BatchValidationReport) -> serde_json::Value {
    let failures: Vec<serde_json::Value> = report
        .failures
        .iter()
        .map(|failure| {
            serde_json::json!({
                "index": failure.index,
                "month": failure.edit.month,
                "category": failure.edit.category,
                "material": failure.edit.material,
                "code": validation_code(&failure.error),
                "error": failure.error.to_string(),
            })
        })
        .collect();
    serde_json::json!({
        "total_edits": report.total_edits,
        "failures": failures,
    })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, details) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", None),
            ApiError::Ledger(err) => match err {
                LedgerError::Validation(inner) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, validation_code(inner), None)
                }
                LedgerError::BatchRejected(report) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "VALIDATION_ERROR",
                    Some(batch_details(report)),
                ),
                LedgerError::StateTransition(reason) => (StatusCode::CONFLICT, reason.code(), None),
                LedgerError::ConcurrencyConflict(_) => {
                    (StatusCode::CONFLICT, "CONCURRENCY_CONFLICT", None)
                }
                LedgerError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", None),
                LedgerError::IntegrityViolation(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTEGRITY_VIOLATION", None)
                }
                LedgerError::Backend(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", None)
                }
            },
        };

        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;
    use waste_ledger::{EditFailure, TransitionRejection};
    use waste_types::{Category, CellEdit};

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::from(LedgerError::NotFound("x".to_string()))
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(LedgerError::StateTransition(TransitionRejection::NoEntries))
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(LedgerError::ConcurrencyConflict("moved".to_string()))
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(ValidationError::InvalidMonth(13))
                .into_response()
                .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::BadRequest("bad date".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn validation_codes_keep_error_kinds_apart() {
        assert_eq!(
            validation_code(&ValidationError::InvalidMaterial {
                category: Category::Compost,
                material: "PET".to_string(),
            }),
            "INVALID_MATERIAL"
        );
        assert_eq!(
            validation_code(&ValidationError::InvalidWeight {
                kg: -1.0,
                reason: "weight must not be negative",
            }),
            "INVALID_WEIGHT"
        );
        assert_eq!(validation_code(&ValidationError::InvalidMonth(0)), "INVALID_MONTH");
    }

    #[test]
    fn batch_details_list_each_failure() {
        let report = BatchValidationReport {
            total_edits: 2,
            failures: vec![EditFailure {
                index: 1,
                edit: CellEdit::new(4, Category::Reuse, "Llantas", 12.0),
                error: ValidationError::InvalidMaterial {
                    category: Category::Reuse,
                    material: "Llantas".to_string(),
                },
            }],
        };
        let details = batch_details(&report);
        assert_eq!(details["total_edits"], 2);
        assert_eq!(details["failures"][0]["index"], 1);
        assert_eq!(details["failures"][0]["month"], 4);
        assert_eq!(details["failures"][0]["category"], "reuse");
        assert_eq!(details["failures"][0]["code"], "INVALID_MATERIAL");
    }
}
