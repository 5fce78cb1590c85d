use crate::{Period, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for an official deviation record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfficialRecordId(pub String);

impl OfficialRecordId {
    pub fn generate() -> Self {
        Self(format!("odr-{}", uuid::Uuid::new_v4()))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for OfficialRecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Certification-grade copy of a closed month's totals.
///
/// Written exactly once per tenant-month by a successful transfer and never
/// mutated afterwards. `content_hash` covers every other field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OfficialDeviationRecord {
    pub record_id: OfficialRecordId,
    pub tenant: TenantId,
    pub period: Period,
    /// recycling + compost + reuse
    pub circular_total: f64,
    pub landfill_total: f64,
    pub grand_total: f64,
    pub deviation_percent: f64,
    pub closed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub content_hash: String,
}
