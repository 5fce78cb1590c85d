use crate::aggregator;
use crate::archive::build_record;
use crate::daily::frozen_month;
use crate::{LedgerError, LedgerResult, TransitionRejection, WasteLedger};
use chrono::Utc;
use tracing::{debug, info, warn};
use waste_storage::{SummaryClose, SummaryRecord};
use waste_types::{
    MonthlySummary, MonthlyTotals, OfficialDeviationRecord, Period, SummaryStatus, TenantId,
    ValidationError,
};

fn summary_view(record: SummaryRecord, totals: MonthlyTotals) -> MonthlySummary {
    MonthlySummary {
        tenant: record.tenant,
        period: record.period,
        totals: totals.totals,
        breakdowns: totals.breakdowns,
        daily_entries_count: totals.daily_entries_count,
        status: record.status,
        closed_by: record.closed_by,
        closed_at: record.closed_at,
        transferred_to_official: record.transferred_to_official,
    }
}

fn frozen_totals(record: &SummaryRecord) -> LedgerResult<MonthlyTotals> {
    record.frozen.clone().ok_or_else(|| {
        LedgerError::IntegrityViolation(format!(
            "summary {} for tenant {} is {} without frozen totals",
            record.period, record.tenant, record.status
        ))
    })
}

impl WasteLedger {
    /// Current view of a month, materializing it as OPEN on first touch.
    ///
    /// OPEN months are recomputed from their daily entries on every read;
    /// CLOSED and TRANSFERRED months report the totals frozen at close.
    pub async fn get_monthly_summary(
        &self,
        tenant: &TenantId,
        year: i32,
        month: u8,
    ) -> LedgerResult<MonthlySummary> {
        let period = Period::new(year, month)?;
        let record = self
            .storage
            .get_or_create_summary(tenant, period, Utc::now())
            .await?;

        let totals = match record.status {
            SummaryStatus::Open => {
                let (from, to) = period.utc_range();
                let entries = self.storage.list_entries(tenant, from, to).await?;
                aggregator::totals_from_entries(&entries)
            }
            SummaryStatus::Closed | SummaryStatus::Transferred => frozen_totals(&record)?,
        };
        debug!(tenant = %tenant, period = %period, status = %record.status, "monthly summary read");
        Ok(summary_view(record, totals))
    }

    /// OPEN → CLOSED: freeze the month's totals from its daily entries.
    pub async fn close_month(
        &self,
        tenant: &TenantId,
        year: i32,
        month: u8,
        closed_by: &str,
    ) -> LedgerResult<MonthlySummary> {
        let period = Period::new(year, month)?;
        let closed_by = closed_by.trim();
        if closed_by.is_empty() {
            return Err(ValidationError::MissingField("closed_by").into());
        }

        let now = Utc::now();
        let record = self.storage.get_or_create_summary(tenant, period, now).await?;
        if let Some(reason) = frozen_month(record.status) {
            warn!(tenant = %tenant, period = %period, %reason, "close refused");
            return Err(LedgerError::StateTransition(reason));
        }

        let (from, to) = period.utc_range();
        let entries = self.storage.list_entries(tenant, from, to).await?;
        let frozen = aggregator::totals_from_entries(&entries);
        if frozen.daily_entries_count == 0 {
            warn!(tenant = %tenant, period = %period, "close refused: no entries");
            return Err(LedgerError::StateTransition(TransitionRejection::NoEntries));
        }
        if !frozen.totals.is_finite() {
            warn!(tenant = %tenant, period = %period, "close refused: totals overflow");
            return Err(LedgerError::IntegrityViolation(format!(
                "month {period} for tenant {tenant} sums to a non-finite total"
            )));
        }

        let closed = self
            .storage
            .close_summary(
                tenant,
                period,
                SummaryClose {
                    frozen: frozen.clone(),
                    closed_by: closed_by.to_string(),
                    closed_at: now,
                },
            )
            .await
            .map_err(|e| {
                warn!(tenant = %tenant, period = %period, error = %e, "close lost compare-and-swap");
                LedgerError::from(e)
            })?;

        info!(
            tenant = %tenant,
            period = %period,
            closed_by,
            entries = frozen.daily_entries_count,
            total_kg = frozen.totals.total(),
            "month closed"
        );
        Ok(summary_view(closed, frozen))
    }

    /// CLOSED → TRANSFERRED: write the month's official record.
    ///
    /// Retrying on a month that is already TRANSFERRED returns the stored
    /// record unchanged.
    pub async fn transfer_month(
        &self,
        tenant: &TenantId,
        year: i32,
        month: u8,
    ) -> LedgerResult<OfficialDeviationRecord> {
        let period = Period::new(year, month)?;
        let record = self.storage.get_summary(tenant, period).await?;
        let record = match record {
            Some(record) if record.status != SummaryStatus::Open => record,
            _ => {
                warn!(tenant = %tenant, period = %period, "transfer refused: month not closed");
                return Err(LedgerError::StateTransition(TransitionRejection::NotClosed));
            }
        };

        if record.status == SummaryStatus::Transferred {
            let existing = self
                .storage
                .get_official_record(tenant, period)
                .await?
                .ok_or_else(|| {
                    LedgerError::IntegrityViolation(format!(
                        "month {period} for tenant {tenant} is TRANSFERRED without an official record"
                    ))
                })?;
            debug!(tenant = %tenant, period = %period, record_id = %existing.record_id, "transfer replayed");
            return Ok(existing);
        }

        let frozen = frozen_totals(&record)?;
        let draft = build_record(tenant, period, &frozen, record.closed_by.clone(), Utc::now())?;
        let stored = self.storage.commit_transfer(draft).await.map_err(|e| {
            warn!(tenant = %tenant, period = %period, error = %e, "transfer lost compare-and-swap");
            LedgerError::from(e)
        })?;

        info!(
            tenant = %tenant,
            period = %period,
            record_id = %stored.record_id,
            deviation_percent = stored.deviation_percent,
            "month transferred to official records"
        );
        Ok(stored)
    }
}
