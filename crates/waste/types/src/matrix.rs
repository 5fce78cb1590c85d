use crate::{month_from_number, validate_cell_weight, Category, MaterialTaxonomy, TenantId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured address of one matrix cell within a tenant-year.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub month: u8,
    pub category: Category,
    pub material: String,
}

impl CellKey {
    pub fn new(month: u8, category: Category, material: impl Into<String>) -> Self {
        Self {
            month,
            category,
            material: material.into(),
        }
    }
}

impl std::fmt::Display for CellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{:02}", self.category, self.material, self.month)
    }
}

/// One requested write into the annual matrix, as submitted.
///
/// `month` stays a wide integer until validation so an out-of-range value
/// is reported as `InvalidMonth` rather than lost in decoding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellEdit {
    pub month: i64,
    pub category: Category,
    pub material: String,
    pub kg: f64,
}

impl CellEdit {
    pub fn new(
        month: impl Into<i64>,
        category: Category,
        material: impl Into<String>,
        kg: f64,
    ) -> Self {
        Self {
            month: month.into(),
            category,
            material: material.into(),
            kg,
        }
    }

    /// Month first, then taxonomy membership, then weight.
    ///
    /// Returns the cell the edit addresses.
    pub fn validate(&self, taxonomy: &MaterialTaxonomy) -> Result<CellKey, ValidationError> {
        let month = month_from_number(self.month)?;
        taxonomy.validate(self.category, &self.material)?;
        validate_cell_weight(self.kg)?;
        Ok(CellKey::new(month, self.category, self.material.clone()))
    }
}

/// A stored matrix cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerCell {
    pub tenant: TenantId,
    pub year: i32,
    #[serde(flatten)]
    pub key: CellKey,
    pub kg: f64,
    pub updated_at: DateTime<Utc>,
}

/// Read-only snapshot of one tenant-year: every stored cell plus the taxonomy.
///
/// Cells are kept sorted by key with no duplicates, so lookups and
/// iteration order are deterministic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct YearMatrix {
    pub tenant: TenantId,
    pub year: i32,
    cells: Vec<LedgerCell>,
    pub taxonomy: MaterialTaxonomy,
}

impl YearMatrix {
    pub fn new(
        tenant: TenantId,
        year: i32,
        mut cells: Vec<LedgerCell>,
        taxonomy: MaterialTaxonomy,
    ) -> Self {
        cells.sort_by(|a, b| a.key.cmp(&b.key));
        // Keep the most recently written value when a key shows up twice.
        cells.dedup_by(|later, earlier| {
            if later.key == earlier.key {
                if later.updated_at >= earlier.updated_at {
                    std::mem::swap(later, earlier);
                }
                true
            } else {
                false
            }
        });
        Self {
            tenant,
            year,
            cells,
            taxonomy,
        }
    }

    pub fn cells(&self) -> &[LedgerCell] {
        &self.cells
    }

    /// Weight stored at a cell; absent cells weigh zero.
    pub fn cell(&self, month: u8, category: Category, material: &str) -> f64 {
        self.cells
            .binary_search_by(|c| {
                (c.key.month, c.key.category, c.key.material.as_str()).cmp(&(
                    month,
                    category,
                    material,
                ))
            })
            .map(|idx| self.cells[idx].kg)
            .unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
