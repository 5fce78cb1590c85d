use crate::{validate_entry_weight, Category, MaterialTaxonomy, Period, TenantId, ValidationError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a daily waste entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observation submitted by a caller, before it is accepted into the log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewDailyEntry {
    /// When the waste was weighed
    pub timestamp: DateTime<Utc>,
    pub category: Category,
    pub material: String,
    pub kg: f64,
    /// Collection point or site area
    pub location: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewDailyEntry {
    pub fn validate(&self, taxonomy: &MaterialTaxonomy) -> Result<(), ValidationError> {
        taxonomy.validate(self.category, &self.material)?;
        validate_entry_weight(self.kg)?;
        if self.location.trim().is_empty() {
            return Err(ValidationError::MissingField("location"));
        }
        Period::containing(self.timestamp)?;
        Ok(())
    }
}

/// Accepted, immutable daily observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyWasteEntry {
    pub entry_id: EntryId,
    pub tenant: TenantId,
    pub timestamp: DateTime<Utc>,
    pub category: Category,
    pub material: String,
    pub kg: f64,
    pub location: String,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl DailyWasteEntry {
    pub fn accept(tenant: TenantId, entry: NewDailyEntry, recorded_at: DateTime<Utc>) -> Self {
        Self {
            entry_id: EntryId::generate(),
            tenant,
            timestamp: entry.timestamp,
            category: entry.category,
            material: entry.material,
            kg: entry.kg,
            location: entry.location,
            notes: entry.notes.filter(|n| !n.trim().is_empty()),
            recorded_at,
        }
    }

    /// UTC calendar date the entry is booked on.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}
