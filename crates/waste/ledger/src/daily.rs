use crate::aggregator;
use crate::{LedgerError, LedgerResult, TransitionRejection, WasteLedger};
use chrono::{Datelike, Days, NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, warn};
use waste_storage::StorageError;
use waste_types::{
    validate_year, CategoryTotals, DailyWasteEntry, NewDailyEntry, Period, SummaryStatus, TenantId,
    ValidationError,
};

/// Rejection for writing into a month that has left OPEN.
pub(crate) fn frozen_month(status: SummaryStatus) -> Option<TransitionRejection> {
    match status {
        SummaryStatus::Open => None,
        SummaryStatus::Closed => Some(TransitionRejection::AlreadyClosed),
        SummaryStatus::Transferred => Some(TransitionRejection::AlreadyTransferred),
    }
}

impl WasteLedger {
    /// Validate and append one daily observation.
    ///
    /// Entries for a month that is no longer OPEN are refused; the check runs
    /// again atomically with the append, so a close racing this call never
    /// ends up with an entry its frozen totals do not include.
    pub async fn record_daily_entry(
        &self,
        tenant: &TenantId,
        entry: NewDailyEntry,
    ) -> LedgerResult<DailyWasteEntry> {
        entry.validate(&self.taxonomy)?;
        let period = Period::containing(entry.timestamp)?;
        let now = Utc::now();

        let summary = self.storage.get_or_create_summary(tenant, period, now).await?;
        if let Some(reason) = frozen_month(summary.status) {
            warn!(tenant = %tenant, period = %period, status = %summary.status, "daily entry refused");
            return Err(LedgerError::StateTransition(reason));
        }

        let accepted = DailyWasteEntry::accept(tenant.clone(), entry, now);
        match self.storage.append_entry(accepted.clone()).await {
            Ok(()) => {}
            Err(StorageError::Conflict(msg)) => {
                // Lost the race against a close; report the state that won.
                let status = self
                    .storage
                    .get_summary(tenant, period)
                    .await?
                    .map(|s| s.status);
                warn!(tenant = %tenant, period = %period, "daily entry raced a lifecycle change");
                return Err(match status.and_then(frozen_month) {
                    Some(reason) => LedgerError::StateTransition(reason),
                    None => LedgerError::ConcurrencyConflict(msg),
                });
            }
            Err(other) => return Err(other.into()),
        }

        info!(
            tenant = %tenant,
            entry_id = %accepted.entry_id,
            category = %accepted.category,
            kg = accepted.kg,
            "daily entry recorded"
        );
        Ok(accepted)
    }

    /// Per-category totals for one UTC calendar day; absent categories are 0.
    pub async fn daily_totals(&self, tenant: &TenantId, date: NaiveDate) -> LedgerResult<CategoryTotals> {
        validate_year(date.year())?;
        let next = date
            .checked_add_days(Days::new(1))
            .ok_or(ValidationError::InvalidYear(date.year()))?;
        let from = date.and_time(NaiveTime::MIN).and_utc();
        let to = next.and_time(NaiveTime::MIN).and_utc();

        let entries = self.storage.list_entries(tenant, from, to).await?;
        debug!(tenant = %tenant, %date, entries = entries.len(), "computing daily totals");
        Ok(aggregator::daily_totals(&entries, date))
    }

    /// Every entry of a tenant-month in `(timestamp, entry_id)` order.
    pub async fn monthly_entries(
        &self,
        tenant: &TenantId,
        year: i32,
        month: u8,
    ) -> LedgerResult<Vec<DailyWasteEntry>> {
        let period = Period::new(year, month)?;
        let (from, to) = period.utc_range();
        Ok(self.storage.list_entries(tenant, from, to).await?)
    }
}
