//! In-memory reference implementation of the waste storage traits.
//!
//! Ephemeral and deterministic; meant for tests and demos. Production
//! deployments should use the PostgreSQL adapter.
//!
//! Operations that span tables take their locks in one fixed order
//! (summaries, entries, cells, records) so they are atomic with respect to
//! each other without deadlocking.

use crate::model::{SummaryClose, SummaryRecord};
use crate::traits::{DailyEntryStore, MatrixStore, OfficialRecordStore, SummaryStore};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use tracing::debug;
use waste_types::{
    CellKey, DailyWasteEntry, LedgerCell, OfficialDeviationRecord, Period,
    SummaryStatus, TenantId,
};

type CellTable = HashMap<(TenantId, i32), BTreeMap<CellKey, StoredCell>>;

#[derive(Debug, Clone, Copy)]
struct StoredCell {
    kg: f64,
    updated_at: DateTime<Utc>,
}

/// In-memory waste ledger storage adapter.
#[derive(Default)]
pub struct InMemoryWasteStorage {
    summaries: RwLock<HashMap<(TenantId, Period), SummaryRecord>>,
    entries: RwLock<HashMap<TenantId, Vec<DailyWasteEntry>>>,
    cells: RwLock<CellTable>,
    records: RwLock<HashMap<(TenantId, Period), OfficialDeviationRecord>>,
}

impl InMemoryWasteStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(table: &str) -> StorageError {
    StorageError::Backend(format!("{table} lock poisoned"))
}

fn entries_in_period(entries: &HashMap<TenantId, Vec<DailyWasteEntry>>, tenant: &TenantId, period: Period) -> usize {
    entries
        .get(tenant)
        .map(|log| log.iter().filter(|e| period.contains(e.timestamp)).count())
        .unwrap_or(0)
}

#[async_trait]
impl MatrixStore for InMemoryWasteStorage {
    async fn upsert_cells(
        &self,
        tenant: &TenantId,
        year: i32,
        cells: BTreeMap<CellKey, f64>,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let mut guard = self.cells.write().map_err(|_| poisoned("cells"))?;
        let sheet = guard.entry((tenant.clone(), year)).or_default();
        for (key, kg) in cells {
            sheet.insert(key, StoredCell { kg, updated_at });
        }
        Ok(())
    }

    async fn list_cells(&self, tenant: &TenantId, year: i32) -> StorageResult<Vec<LedgerCell>> {
        let guard = self.cells.read().map_err(|_| poisoned("cells"))?;
        let Some(sheet) = guard.get(&(tenant.clone(), year)) else {
            return Ok(Vec::new());
        };
        Ok(sheet
            .iter()
            .map(|(key, stored)| LedgerCell {
                tenant: tenant.clone(),
                year,
                key: key.clone(),
                kg: stored.kg,
                updated_at: stored.updated_at,
            })
            .collect())
    }
}

#[async_trait]
impl DailyEntryStore for InMemoryWasteStorage {
    async fn append_entry(&self, entry: DailyWasteEntry) -> StorageResult<()> {
        let period = Period::containing(entry.timestamp)
            .map_err(|e| StorageError::InvalidInput(e.to_string()))?;

        let mut summaries = self.summaries.write().map_err(|_| poisoned("summaries"))?;
        let summary = summaries
            .entry((entry.tenant.clone(), period))
            .or_insert_with(|| SummaryRecord::open(entry.tenant.clone(), period, entry.recorded_at));
        if summary.status != SummaryStatus::Open {
            return Err(StorageError::Conflict(format!(
                "month {} for tenant {} is {}, entries are frozen",
                period, entry.tenant, summary.status
            )));
        }

        let mut entries = self.entries.write().map_err(|_| poisoned("entries"))?;
        debug!(tenant = %entry.tenant, entry_id = %entry.entry_id, "appending daily entry");
        entries.entry(entry.tenant.clone()).or_default().push(entry);
        Ok(())
    }

    async fn list_entries(
        &self,
        tenant: &TenantId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<DailyWasteEntry>> {
        let guard = self.entries.read().map_err(|_| poisoned("entries"))?;
        let mut values = guard
            .get(tenant)
            .map(|log| {
                log.iter()
                    .filter(|e| e.timestamp >= from && e.timestamp < to)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        values.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.entry_id.cmp(&b.entry_id))
        });
        Ok(values)
    }
}

#[async_trait]
impl SummaryStore for InMemoryWasteStorage {
    async fn get_or_create_summary(
        &self,
        tenant: &TenantId,
        period: Period,
        now: DateTime<Utc>,
    ) -> StorageResult<SummaryRecord> {
        let mut guard = self.summaries.write().map_err(|_| poisoned("summaries"))?;
        Ok(guard
            .entry((tenant.clone(), period))
            .or_insert_with(|| SummaryRecord::open(tenant.clone(), period, now))
            .clone())
    }

    async fn get_summary(
        &self,
        tenant: &TenantId,
        period: Period,
    ) -> StorageResult<Option<SummaryRecord>> {
        let guard = self.summaries.read().map_err(|_| poisoned("summaries"))?;
        Ok(guard.get(&(tenant.clone(), period)).cloned())
    }

    async fn close_summary(
        &self,
        tenant: &TenantId,
        period: Period,
        close: SummaryClose,
    ) -> StorageResult<SummaryRecord> {
        let mut summaries = self.summaries.write().map_err(|_| poisoned("summaries"))?;
        let record = summaries.get_mut(&(tenant.clone(), period)).ok_or_else(|| {
            StorageError::NotFound(format!("summary {period} for tenant {tenant} not found"))
        })?;

        if record.status != SummaryStatus::Open {
            return Err(StorageError::Conflict(format!(
                "close expected OPEN, found {}",
                record.status
            )));
        }

        let entries = self.entries.read().map_err(|_| poisoned("entries"))?;
        let stored = entries_in_period(&entries, tenant, period);
        if stored != close.frozen.daily_entries_count {
            return Err(StorageError::Conflict(format!(
                "close computed from {} entries but {} are stored",
                close.frozen.daily_entries_count, stored
            )));
        }

        record.status = SummaryStatus::Closed;
        record.frozen = Some(close.frozen);
        record.closed_by = Some(close.closed_by);
        record.closed_at = Some(close.closed_at);
        record.updated_at = close.closed_at;
        Ok(record.clone())
    }
}

#[async_trait]
impl OfficialRecordStore for InMemoryWasteStorage {
    async fn commit_transfer(
        &self,
        record: OfficialDeviationRecord,
    ) -> StorageResult<OfficialDeviationRecord> {
        let key = (record.tenant.clone(), record.period);
        let mut summaries = self.summaries.write().map_err(|_| poisoned("summaries"))?;
        let mut records = self.records.write().map_err(|_| poisoned("records"))?;

        if let Some(existing) = records.get(&key) {
            return Ok(existing.clone());
        }

        let summary = summaries.get_mut(&key).ok_or_else(|| {
            StorageError::Conflict(format!(
                "no summary {} for tenant {}",
                record.period, record.tenant
            ))
        })?;
        if summary.status != SummaryStatus::Closed {
            return Err(StorageError::Conflict(format!(
                "transfer expected CLOSED, found {}",
                summary.status
            )));
        }

        summary.status = SummaryStatus::Transferred;
        summary.transferred_to_official = true;
        summary.updated_at = record.created_at;
        records.insert(key, record.clone());
        Ok(record)
    }

    async fn get_official_record(
        &self,
        tenant: &TenantId,
        period: Period,
    ) -> StorageResult<Option<OfficialDeviationRecord>> {
        let guard = self.records.read().map_err(|_| poisoned("records"))?;
        Ok(guard.get(&(tenant.clone(), period)).cloned())
    }

    async fn list_official_records(
        &self,
        tenant: &TenantId,
        year: i32,
    ) -> StorageResult<Vec<OfficialDeviationRecord>> {
        let guard = self.records.read().map_err(|_| poisoned("records"))?;
        let mut values = guard
            .iter()
            .filter(|((t, p), _)| t == tenant && p.year() == year)
            .map(|(_, record)| record.clone())
            .collect::<Vec<_>>();
        values.sort_by_key(|r| r.period);
        Ok(values)
    }
}
