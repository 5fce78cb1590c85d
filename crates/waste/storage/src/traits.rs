use crate::model::{SummaryClose, SummaryRecord};
use crate::StorageResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use waste_types::{CellKey, DailyWasteEntry, LedgerCell, OfficialDeviationRecord, Period, TenantId};

/// Storage interface for the annual matrix.
#[async_trait]
pub trait MatrixStore: Send + Sync {
    /// Write every cell in a single transaction, replacing stored values.
    ///
    /// Cells are already validated. Concurrent readers observe either none
    /// or all of them.
    async fn upsert_cells(
        &self,
        tenant: &TenantId,
        year: i32,
        cells: BTreeMap<CellKey, f64>,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// All stored cells of a tenant-year.
    async fn list_cells(&self, tenant: &TenantId, year: i32) -> StorageResult<Vec<LedgerCell>>;
}

/// Storage interface for the append-only daily entry log.
#[async_trait]
pub trait DailyEntryStore: Send + Sync {
    /// Append an entry while its month is still OPEN.
    ///
    /// Materializes the month summary when absent. Returns
    /// [`StorageError::Conflict`](crate::StorageError::Conflict) if the month
    /// has left OPEN.
    async fn append_entry(&self, entry: DailyWasteEntry) -> StorageResult<()>;

    /// Entries with `from <= timestamp < to`, ordered by timestamp then id.
    async fn list_entries(
        &self,
        tenant: &TenantId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<DailyWasteEntry>>;
}

/// Storage interface for monthly lifecycle rows.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Fetch the row, inserting an OPEN one on first touch.
    async fn get_or_create_summary(
        &self,
        tenant: &TenantId,
        period: Period,
        now: DateTime<Utc>,
    ) -> StorageResult<SummaryRecord>;

    async fn get_summary(
        &self,
        tenant: &TenantId,
        period: Period,
    ) -> StorageResult<Option<SummaryRecord>>;

    /// Compare-and-swap OPEN → CLOSED.
    ///
    /// Applied only if the stored status is still OPEN and the stored entry
    /// count equals `close.frozen.daily_entries_count`; otherwise `Conflict`.
    async fn close_summary(
        &self,
        tenant: &TenantId,
        period: Period,
        close: SummaryClose,
    ) -> StorageResult<SummaryRecord>;
}

/// Storage interface for the write-once official archive.
#[async_trait]
pub trait OfficialRecordStore: Send + Sync {
    /// Atomically insert the record and move its month CLOSED → TRANSFERRED.
    ///
    /// If a record already exists for the month, it is returned unchanged and
    /// `record` is discarded. If no record exists and the month is not
    /// CLOSED, returns `Conflict`.
    async fn commit_transfer(
        &self,
        record: OfficialDeviationRecord,
    ) -> StorageResult<OfficialDeviationRecord>;

    async fn get_official_record(
        &self,
        tenant: &TenantId,
        period: Period,
    ) -> StorageResult<Option<OfficialDeviationRecord>>;

    /// A year's records ordered by month.
    async fn list_official_records(
        &self,
        tenant: &TenantId,
        year: i32,
    ) -> StorageResult<Vec<OfficialDeviationRecord>>;
}

/// Unified storage bundle the ledger runs on.
pub trait WasteStorage:
    MatrixStore + DailyEntryStore + SummaryStore + OfficialRecordStore + Send + Sync
{
}

impl<T> WasteStorage for T where
    T: MatrixStore + DailyEntryStore + SummaryStore + OfficialRecordStore + Send + Sync
{
}
