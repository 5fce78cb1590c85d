use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use waste_types::{MonthlyTotals, Period, SummaryStatus, TenantId};

/// Persistent lifecycle row for one tenant-month.
///
/// Materialized as OPEN on first touch. `frozen` is set exactly when the
/// month leaves OPEN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub tenant: TenantId,
    pub period: Period,
    pub status: SummaryStatus,
    pub frozen: Option<MonthlyTotals>,
    pub closed_by: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub transferred_to_official: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SummaryRecord {
    pub fn open(tenant: TenantId, period: Period, now: DateTime<Utc>) -> Self {
        Self {
            tenant,
            period,
            status: SummaryStatus::Open,
            frozen: None,
            closed_by: None,
            closed_at: None,
            transferred_to_official: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// OPEN → CLOSED payload.
///
/// `frozen.daily_entries_count` doubles as the expected number of stored
/// entries for the month; the store refuses the close when they differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryClose {
    pub frozen: MonthlyTotals,
    pub closed_by: String,
    pub closed_at: DateTime<Utc>,
}
