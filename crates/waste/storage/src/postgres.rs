//! PostgreSQL adapter for waste ledger storage.
//!
//! This adapter is the transactional source-of-truth backend. Lifecycle
//! transitions lock the month's summary row (`SELECT ... FOR UPDATE`), so
//! appends, closes and transfers on the same tenant-month serialize while
//! unrelated months proceed in parallel.

use crate::model::{SummaryClose, SummaryRecord};
use crate::traits::{DailyEntryStore, MatrixStore, OfficialRecordStore, SummaryStore};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Acquire, Row};
use std::collections::BTreeMap;
use tracing::debug;
use waste_types::{
    CellKey, DailyWasteEntry, EntryId, LedgerCell, MonthlyTotals,
    OfficialDeviationRecord, OfficialRecordId, Period, SummaryStatus, TenantId,
};

/// PostgreSQL-backed storage adapter.
#[derive(Clone)]
pub struct PostgresWasteStorage {
    pool: PgPool,
}

impl PostgresWasteStorage {
    /// Connect to PostgreSQL and initialize required schema.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        Self::connect_with_options(database_url, 10, 5).await
    }

    /// Connect with explicit pool parameters.
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Backend(format!("failed to connect postgres: {e}")))?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create adapter from an existing pool.
    pub async fn from_pool(pool: PgPool) -> StorageResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> StorageResult<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS waste_ledger_cells (
                tenant TEXT NOT NULL,
                year INTEGER NOT NULL,
                month SMALLINT NOT NULL,
                category TEXT NOT NULL,
                material TEXT NOT NULL,
                kg DOUBLE PRECISION NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (tenant, year, month, category, material)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS waste_daily_entries (
                entry_id TEXT PRIMARY KEY,
                tenant TEXT NOT NULL,
                occurred_at TIMESTAMPTZ NOT NULL,
                category TEXT NOT NULL,
                material TEXT NOT NULL,
                kg DOUBLE PRECISION NOT NULL,
                location TEXT NOT NULL,
                notes TEXT,
                recorded_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS waste_daily_entries_tenant_time
                ON waste_daily_entries (tenant, occurred_at)
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS waste_monthly_summaries (
                tenant TEXT NOT NULL,
                year INTEGER NOT NULL,
                month SMALLINT NOT NULL,
                status TEXT NOT NULL,
                frozen JSONB,
                closed_by TEXT,
                closed_at TIMESTAMPTZ,
                transferred_to_official BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (tenant, year, month)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS waste_official_records (
                tenant TEXT NOT NULL,
                year INTEGER NOT NULL,
                month SMALLINT NOT NULL,
                record_id TEXT NOT NULL UNIQUE,
                circular_total DOUBLE PRECISION NOT NULL,
                landfill_total DOUBLE PRECISION NOT NULL,
                grand_total DOUBLE PRECISION NOT NULL,
                deviation_percent DOUBLE PRECISION NOT NULL,
                closed_by TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                content_hash TEXT NOT NULL,
                PRIMARY KEY (tenant, year, month)
            )
            "#,
        ];

        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }
}

const SUMMARY_COLUMNS: &str = "tenant, year, month, status, frozen, closed_by, closed_at, \
     transferred_to_official, created_at, updated_at";

const RECORD_COLUMNS: &str = "tenant, year, month, record_id, circular_total, landfill_total, \
     grand_total, deviation_percent, closed_by, created_at, content_hash";

#[async_trait]
impl MatrixStore for PostgresWasteStorage {
    async fn upsert_cells(
        &self,
        tenant: &TenantId,
        year: i32,
        cells: BTreeMap<CellKey, f64>,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let conn = tx.acquire().await.map_err(backend)?;

        for (key, kg) in &cells {
            sqlx::query(
                r#"
                INSERT INTO waste_ledger_cells
                    (tenant, year, month, category, material, kg, updated_at)
                VALUES
                    ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (tenant, year, month, category, material)
                DO UPDATE SET kg = EXCLUDED.kg, updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(tenant.as_str())
            .bind(year)
            .bind(i16::from(key.month))
            .bind(key.category.as_str())
            .bind(key.material.as_str())
            .bind(*kg)
            .bind(updated_at)
            .execute(&mut *conn)
            .await
            .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)?;
        debug!(tenant = %tenant, year, cells = cells.len(), "matrix cells upserted");
        Ok(())
    }

    async fn list_cells(&self, tenant: &TenantId, year: i32) -> StorageResult<Vec<LedgerCell>> {
        let rows = sqlx::query(
            r#"
            SELECT tenant, year, month, category, material, kg, updated_at
              FROM waste_ledger_cells
             WHERE tenant = $1 AND year = $2
             ORDER BY month ASC, category ASC, material ASC
            "#,
        )
        .bind(tenant.as_str())
        .bind(year)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(cell_row_to_record).collect()
    }
}

#[async_trait]
impl DailyEntryStore for PostgresWasteStorage {
    async fn append_entry(&self, entry: DailyWasteEntry) -> StorageResult<()> {
        let period = Period::containing(entry.timestamp)
            .map_err(|e| StorageError::InvalidInput(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(backend)?;
        let conn = tx.acquire().await.map_err(backend)?;

        insert_open_summary(&mut *conn, &entry.tenant, period, entry.recorded_at).await?;
        let status = lock_summary_status(&mut *conn, &entry.tenant, period)
            .await?
            .ok_or_else(|| StorageError::Backend("summary row vanished under lock".to_string()))?;
        if status != SummaryStatus::Open {
            return Err(StorageError::Conflict(format!(
                "month {} for tenant {} is {}, entries are frozen",
                period, entry.tenant, status
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO waste_daily_entries
                (entry_id, tenant, occurred_at, category, material, kg, location, notes, recorded_at)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.entry_id.0.as_str())
        .bind(entry.tenant.as_str())
        .bind(entry.timestamp)
        .bind(entry.category.as_str())
        .bind(entry.material.as_str())
        .bind(entry.kg)
        .bind(entry.location.as_str())
        .bind(entry.notes.as_deref())
        .bind(entry.recorded_at)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_conflict)?;

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn list_entries(
        &self,
        tenant: &TenantId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<DailyWasteEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT entry_id, tenant, occurred_at, category, material, kg, location, notes, recorded_at
              FROM waste_daily_entries
             WHERE tenant = $1 AND occurred_at >= $2 AND occurred_at < $3
             ORDER BY occurred_at ASC, entry_id ASC
            "#,
        )
        .bind(tenant.as_str())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(entry_row_to_record).collect()
    }
}

#[async_trait]
impl SummaryStore for PostgresWasteStorage {
    async fn get_or_create_summary(
        &self,
        tenant: &TenantId,
        period: Period,
        now: DateTime<Utc>,
    ) -> StorageResult<SummaryRecord> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        insert_open_summary(&mut *conn, tenant, period, now).await?;
        drop(conn);
        self.get_summary(tenant, period).await?.ok_or_else(|| {
            StorageError::Backend(format!("summary {period} for tenant {tenant} missing after insert"))
        })
    }

    async fn get_summary(
        &self,
        tenant: &TenantId,
        period: Period,
    ) -> StorageResult<Option<SummaryRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM waste_monthly_summaries \
             WHERE tenant = $1 AND year = $2 AND month = $3"
        ))
        .bind(tenant.as_str())
        .bind(period.year())
        .bind(i16::from(period.month()))
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(summary_row_to_record).transpose()
    }

    async fn close_summary(
        &self,
        tenant: &TenantId,
        period: Period,
        close: SummaryClose,
    ) -> StorageResult<SummaryRecord> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let conn = tx.acquire().await.map_err(backend)?;

        let status = lock_summary_status(&mut *conn, tenant, period)
            .await?
            .ok_or_else(|| {
                StorageError::NotFound(format!("summary {period} for tenant {tenant} not found"))
            })?;
        if status != SummaryStatus::Open {
            return Err(StorageError::Conflict(format!(
                "close expected OPEN, found {status}"
            )));
        }

        let (from, to) = period.utc_range();
        let stored: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) AS n
              FROM waste_daily_entries
             WHERE tenant = $1 AND occurred_at >= $2 AND occurred_at < $3
            "#,
        )
        .bind(tenant.as_str())
        .bind(from)
        .bind(to)
        .fetch_one(&mut *conn)
        .await
        .map_err(backend)?
        .try_get("n")
        .map_err(backend)?;
        if stored != to_i64(close.frozen.daily_entries_count)? {
            return Err(StorageError::Conflict(format!(
                "close computed from {} entries but {} are stored",
                close.frozen.daily_entries_count, stored
            )));
        }

        let frozen_json = serde_json::to_value(&close.frozen)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let row = sqlx::query(&format!(
            "UPDATE waste_monthly_summaries \
                SET status = 'CLOSED', frozen = $4, closed_by = $5, closed_at = $6, updated_at = $6 \
              WHERE tenant = $1 AND year = $2 AND month = $3 AND status = 'OPEN' \
          RETURNING {SUMMARY_COLUMNS}"
        ))
        .bind(tenant.as_str())
        .bind(period.year())
        .bind(i16::from(period.month()))
        .bind(frozen_json)
        .bind(close.closed_by.as_str())
        .bind(close.closed_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(backend)?;
        let record = summary_row_to_record(row)?;

        tx.commit().await.map_err(backend)?;
        Ok(record)
    }
}

#[async_trait]
impl OfficialRecordStore for PostgresWasteStorage {
    async fn commit_transfer(
        &self,
        record: OfficialDeviationRecord,
    ) -> StorageResult<OfficialDeviationRecord> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let conn = tx.acquire().await.map_err(backend)?;

        let status = lock_summary_status(&mut *conn, &record.tenant, record.period).await?;

        let existing = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM waste_official_records \
             WHERE tenant = $1 AND year = $2 AND month = $3"
        ))
        .bind(record.tenant.as_str())
        .bind(record.period.year())
        .bind(i16::from(record.period.month()))
        .fetch_optional(&mut *conn)
        .await
        .map_err(backend)?;
        if let Some(row) = existing {
            return official_row_to_record(row);
        }

        match status {
            Some(SummaryStatus::Closed) => {}
            Some(other) => {
                return Err(StorageError::Conflict(format!(
                    "transfer expected CLOSED, found {other}"
                )))
            }
            None => {
                return Err(StorageError::Conflict(format!(
                    "no summary {} for tenant {}",
                    record.period, record.tenant
                )))
            }
        }

        sqlx::query(&format!(
            "INSERT INTO waste_official_records ({RECORD_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(record.tenant.as_str())
        .bind(record.period.year())
        .bind(i16::from(record.period.month()))
        .bind(record.record_id.0.as_str())
        .bind(record.circular_total)
        .bind(record.landfill_total)
        .bind(record.grand_total)
        .bind(record.deviation_percent)
        .bind(record.closed_by.as_deref())
        .bind(record.created_at)
        .bind(record.content_hash.as_str())
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_conflict)?;

        sqlx::query(
            r#"
            UPDATE waste_monthly_summaries
               SET status = 'TRANSFERRED', transferred_to_official = TRUE, updated_at = $4
             WHERE tenant = $1 AND year = $2 AND month = $3 AND status = 'CLOSED'
            "#,
        )
        .bind(record.tenant.as_str())
        .bind(record.period.year())
        .bind(i16::from(record.period.month()))
        .bind(record.created_at)
        .execute(&mut *conn)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(record)
    }

    async fn get_official_record(
        &self,
        tenant: &TenantId,
        period: Period,
    ) -> StorageResult<Option<OfficialDeviationRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM waste_official_records \
             WHERE tenant = $1 AND year = $2 AND month = $3"
        ))
        .bind(tenant.as_str())
        .bind(period.year())
        .bind(i16::from(period.month()))
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(official_row_to_record).transpose()
    }

    async fn list_official_records(
        &self,
        tenant: &TenantId,
        year: i32,
    ) -> StorageResult<Vec<OfficialDeviationRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM waste_official_records \
             WHERE tenant = $1 AND year = $2 ORDER BY month ASC"
        ))
        .bind(tenant.as_str())
        .bind(year)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(official_row_to_record).collect()
    }
}

async fn insert_open_summary(
    conn: &mut sqlx::PgConnection,
    tenant: &TenantId,
    period: Period,
    now: DateTime<Utc>,
) -> StorageResult<()> {
    sqlx::query(
        r#"
        INSERT INTO waste_monthly_summaries
            (tenant, year, month, status, transferred_to_official, created_at, updated_at)
        VALUES
            ($1, $2, $3, 'OPEN', FALSE, $4, $4)
        ON CONFLICT (tenant, year, month) DO NOTHING
        "#,
    )
    .bind(tenant.as_str())
    .bind(period.year())
    .bind(i16::from(period.month()))
    .bind(now)
    .execute(conn)
    .await
    .map_err(backend)?;
    Ok(())
}

async fn lock_summary_status(
    conn: &mut sqlx::PgConnection,
    tenant: &TenantId,
    period: Period,
) -> StorageResult<Option<SummaryStatus>> {
    let row = sqlx::query(
        r#"
        SELECT status
          FROM waste_monthly_summaries
         WHERE tenant = $1 AND year = $2 AND month = $3
         FOR UPDATE
        "#,
    )
    .bind(tenant.as_str())
    .bind(period.year())
    .bind(i16::from(period.month()))
    .fetch_optional(conn)
    .await
    .map_err(backend)?;

    row.map(|row| {
        let raw: String = row.try_get("status").map_err(backend)?;
        parse_status(&raw)
    })
    .transpose()
}

fn cell_row_to_record(row: PgRow) -> StorageResult<LedgerCell> {
    let month: i16 = row.try_get("month").map_err(backend)?;
    let category: String = row.try_get("category").map_err(backend)?;
    Ok(LedgerCell {
        tenant: TenantId::new(row.try_get::<String, _>("tenant").map_err(backend)?),
        year: row.try_get("year").map_err(backend)?,
        key: CellKey::new(
            to_month(month)?,
            category
                .parse()
                .map_err(|e: waste_types::ValidationError| StorageError::Serialization(e.to_string()))?,
            row.try_get::<String, _>("material").map_err(backend)?,
        ),
        kg: row.try_get("kg").map_err(backend)?,
        updated_at: row.try_get("updated_at").map_err(backend)?,
    })
}

fn entry_row_to_record(row: PgRow) -> StorageResult<DailyWasteEntry> {
    let category: String = row.try_get("category").map_err(backend)?;
    Ok(DailyWasteEntry {
        entry_id: EntryId::new(row.try_get::<String, _>("entry_id").map_err(backend)?),
        tenant: TenantId::new(row.try_get::<String, _>("tenant").map_err(backend)?),
        timestamp: row.try_get("occurred_at").map_err(backend)?,
        category: category
            .parse()
            .map_err(|e: waste_types::ValidationError| StorageError::Serialization(e.to_string()))?,
        material: row.try_get("material").map_err(backend)?,
        kg: row.try_get("kg").map_err(backend)?,
        location: row.try_get("location").map_err(backend)?,
        notes: row.try_get("notes").map_err(backend)?,
        recorded_at: row.try_get("recorded_at").map_err(backend)?,
    })
}

fn summary_row_to_record(row: PgRow) -> StorageResult<SummaryRecord> {
    let status: String = row.try_get("status").map_err(backend)?;
    let frozen_json: Option<serde_json::Value> = row.try_get("frozen").map_err(backend)?;
    let frozen: Option<MonthlyTotals> = frozen_json
        .map(|v| serde_json::from_value(v).map_err(|e| StorageError::Serialization(e.to_string())))
        .transpose()?;

    Ok(SummaryRecord {
        tenant: TenantId::new(row.try_get::<String, _>("tenant").map_err(backend)?),
        period: row_period(&row)?,
        status: parse_status(&status)?,
        frozen,
        closed_by: row.try_get("closed_by").map_err(backend)?,
        closed_at: row.try_get("closed_at").map_err(backend)?,
        transferred_to_official: row.try_get("transferred_to_official").map_err(backend)?,
        created_at: row.try_get("created_at").map_err(backend)?,
        updated_at: row.try_get("updated_at").map_err(backend)?,
    })
}

fn official_row_to_record(row: PgRow) -> StorageResult<OfficialDeviationRecord> {
    Ok(OfficialDeviationRecord {
        record_id: OfficialRecordId::new(row.try_get::<String, _>("record_id").map_err(backend)?),
        tenant: TenantId::new(row.try_get::<String, _>("tenant").map_err(backend)?),
        period: row_period(&row)?,
        circular_total: row.try_get("circular_total").map_err(backend)?,
        landfill_total: row.try_get("landfill_total").map_err(backend)?,
        grand_total: row.try_get("grand_total").map_err(backend)?,
        deviation_percent: row.try_get("deviation_percent").map_err(backend)?,
        closed_by: row.try_get("closed_by").map_err(backend)?,
        created_at: row.try_get("created_at").map_err(backend)?,
        content_hash: row.try_get("content_hash").map_err(backend)?,
    })
}

fn row_period(row: &PgRow) -> StorageResult<Period> {
    let year: i32 = row.try_get("year").map_err(backend)?;
    let month: i16 = row.try_get("month").map_err(backend)?;
    Period::new(year, to_month(month)?).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn to_month(raw: i16) -> StorageResult<u8> {
    u8::try_from(raw).map_err(|_| StorageError::Serialization(format!("invalid stored month {raw}")))
}

fn parse_status(raw: &str) -> StorageResult<SummaryStatus> {
    raw.parse()
        .map_err(|e: waste_types::ValidationError| StorageError::Serialization(e.to_string()))
}

fn backend(err: sqlx::Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn map_sqlx_conflict(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return StorageError::Conflict(db_err.message().to_string());
        }
    }
    backend(err)
}

fn to_i64(value: usize) -> StorageResult<i64> {
    i64::try_from(value)
        .map_err(|_| StorageError::InvalidInput("entry count too large".to_string()))
}
