use serde::{Deserialize, Serialize};
use thiserror::Error;
use waste_storage::StorageError;
use waste_types::{CellEdit, ValidationError};

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Why a lifecycle request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionRejection {
    AlreadyClosed,
    NoEntries,
    NotClosed,
    AlreadyTransferred,
}

impl TransitionRejection {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            TransitionRejection::AlreadyClosed => "ALREADY_CLOSED",
            TransitionRejection::NoEntries => "NO_ENTRIES",
            TransitionRejection::NotClosed => "NOT_CLOSED",
            TransitionRejection::AlreadyTransferred => "ALREADY_TRANSFERRED",
        }
    }
}

impl std::fmt::Display for TransitionRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TransitionRejection::AlreadyClosed => "month is already closed",
            TransitionRejection::NoEntries => "month has no daily entries",
            TransitionRejection::NotClosed => "month is not closed",
            TransitionRejection::AlreadyTransferred => "month was already transferred",
        };
        f.write_str(text)
    }
}

/// One rejected edit inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct EditFailure {
    /// Position of the edit in the submitted batch
    pub index: usize,
    pub edit: CellEdit,
    pub error: ValidationError,
}

/// Every validation failure found in a rejected batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchValidationReport {
    pub total_edits: usize,
    pub failures: Vec<EditFailure>,
}

impl std::fmt::Display for BatchValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {} edits failed validation",
            self.failures.len(),
            self.total_edits
        )?;
        if let Some(first) = self.failures.first() {
            write!(
                f,
                " (first: edit {} at {}/{}/{}: {})",
                first.index, first.edit.category, first.edit.material, first.edit.month, first.error
            )?;
        }
        Ok(())
    }
}

/// Ledger-related errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("batch rejected: {0}")]
    BatchRejected(BatchValidationReport),

    #[error("illegal lifecycle transition: {0}")]
    StateTransition(TransitionRejection),

    /// The stored state moved under the caller; re-read and retry.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<StorageError> for LedgerError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::NotFound(msg) => Self::NotFound(msg),
            StorageError::Conflict(msg) => Self::ConcurrencyConflict(msg),
            StorageError::InvalidInput(msg)
            | StorageError::Serialization(msg)
            | StorageError::Backend(msg) => Self::Backend(msg),
        }
    }
}
