use crate::Category;
use thiserror::Error;

/// Rejection of malformed write input.
///
/// Raised synchronously before anything is written.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("material `{material}` is not part of the {category} taxonomy")]
    InvalidMaterial { category: Category, material: String },

    #[error("invalid weight {kg} kg: {reason}")]
    InvalidWeight { kg: f64, reason: &'static str },

    #[error("invalid month {0}: expected 1..=12")]
    InvalidMonth(i64),

    #[error("invalid year {0}")]
    InvalidYear(i32),

    #[error("unknown waste category `{0}`")]
    InvalidCategory(String),

    #[error("unknown summary status `{0}`")]
    InvalidStatus(String),

    #[error("invalid material taxonomy: {0}")]
    InvalidTaxonomy(String),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}

/// Largest weight a single cell or entry may carry.
///
/// Keeps every year and month sum far from `f64` overflow.
pub const MAX_WEIGHT_KG: f64 = 1.0e9;

/// Matrix cells accept any finite, non-negative weight up to [`MAX_WEIGHT_KG`].
pub fn validate_cell_weight(kg: f64) -> Result<f64, ValidationError> {
    if !kg.is_finite() {
        return Err(ValidationError::InvalidWeight {
            kg,
            reason: "weight must be finite",
        });
    }
    if kg < 0.0 {
        return Err(ValidationError::InvalidWeight {
            kg,
            reason: "weight must not be negative",
        });
    }
    if kg > MAX_WEIGHT_KG {
        return Err(ValidationError::InvalidWeight {
            kg,
            reason: "weight exceeds maximum",
        });
    }
    Ok(kg)
}

/// Daily entries must weigh something: a zero observation carries no information.
pub fn validate_entry_weight(kg: f64) -> Result<f64, ValidationError> {
    let kg = validate_cell_weight(kg)?;
    if kg == 0.0 {
        return Err(ValidationError::InvalidWeight {
            kg,
            reason: "daily entries must be heavier than zero",
        });
    }
    Ok(kg)
}
