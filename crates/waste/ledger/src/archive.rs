use crate::aggregator::diversion_index;
use crate::{LedgerError, LedgerResult, WasteLedger};
use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, warn};
use waste_types::{MonthlyTotals, OfficialDeviationRecord, OfficialRecordId, Period, TenantId};

/// BLAKE3 hex digest over every field of the record except the hash itself.
pub fn compute_record_hash(record: &OfficialDeviationRecord) -> LedgerResult<String> {
    let serializable = serde_json::json!({
        "record_id": record.record_id.0,
        "tenant": record.tenant.as_str(),
        "year": record.period.year(),
        "month": record.period.month(),
        "circular_total": record.circular_total,
        "landfill_total": record.landfill_total,
        "grand_total": record.grand_total,
        "deviation_percent": record.deviation_percent,
        "closed_by": record.closed_by,
        "created_at": record.created_at,
    });
    let serialized =
        serde_json::to_vec(&serializable).map_err(|e| LedgerError::Backend(e.to_string()))?;
    Ok(blake3::hash(&serialized).to_hex().to_string())
}

pub(crate) fn build_record(
    tenant: &TenantId,
    period: Period,
    frozen: &MonthlyTotals,
    closed_by: Option<String>,
    now: DateTime<Utc>,
) -> LedgerResult<OfficialDeviationRecord> {
    if !frozen.totals.is_finite() {
        return Err(LedgerError::IntegrityViolation(format!(
            "month {period} for tenant {tenant} has non-finite frozen totals"
        )));
    }
    let circular_total = frozen.totals.circular();
    let landfill_total = frozen.totals.landfill;
    let mut record = OfficialDeviationRecord {
        record_id: OfficialRecordId::generate(),
        tenant: tenant.clone(),
        period,
        circular_total,
        landfill_total,
        grand_total: circular_total + landfill_total,
        deviation_percent: diversion_index(circular_total, landfill_total),
        closed_by,
        // Stored timestamps keep microsecond precision.
        created_at: now.trunc_subsecs(6),
        content_hash: String::new(),
    };
    record.content_hash = compute_record_hash(&record)?;
    Ok(record)
}

impl WasteLedger {
    pub async fn get_official_record(
        &self,
        tenant: &TenantId,
        year: i32,
        month: u8,
    ) -> LedgerResult<OfficialDeviationRecord> {
        let period = Period::new(year, month)?;
        self.storage
            .get_official_record(tenant, period)
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound(format!("official record {period} for tenant {tenant}"))
            })
    }

    /// A year's official records ordered by month.
    pub async fn list_official_records(
        &self,
        tenant: &TenantId,
        year: i32,
    ) -> LedgerResult<Vec<OfficialDeviationRecord>> {
        waste_types::validate_year(year)?;
        Ok(self.storage.list_official_records(tenant, year).await?)
    }

    /// Re-derive a stored record and check it was not altered.
    ///
    /// Recomputes the content hash, the grand total and the diversion index
    /// from the stored totals, and compares the totals with the month's
    /// frozen summary.
    pub async fn verify_official_record(
        &self,
        tenant: &TenantId,
        year: i32,
        month: u8,
    ) -> LedgerResult<OfficialDeviationRecord> {
        let record = self.get_official_record(tenant, year, month).await?;
        let fail = |what: &str| {
            warn!(tenant = %tenant, period = %record.period, record_id = %record.record_id, what, "official record failed verification");
            LedgerError::IntegrityViolation(format!(
                "official record {} for {}: {what}",
                record.record_id, record.period
            ))
        };

        if compute_record_hash(&record)? != record.content_hash {
            return Err(fail("content hash mismatch"));
        }
        if record.grand_total != record.circular_total + record.landfill_total {
            return Err(fail("grand total does not match its parts"));
        }
        if record.deviation_percent != diversion_index(record.circular_total, record.landfill_total) {
            return Err(fail("deviation percent does not reproduce"));
        }

        let frozen = self
            .storage
            .get_summary(tenant, record.period)
            .await?
            .and_then(|summary| summary.frozen);
        match frozen {
            Some(frozen)
                if frozen.totals.circular() == record.circular_total
                    && frozen.totals.landfill == record.landfill_total => {}
            Some(_) => return Err(fail("totals differ from the frozen summary")),
            None => return Err(fail("no frozen summary backs this record")),
        }

        debug!(tenant = %tenant, record_id = %record.record_id, "official record verified");
        Ok(record)
    }
}
