//! End-to-end ledger scenarios over the in-memory backend.

use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use waste_ledger::{aggregator, LedgerError, TransitionRejection, WasteLedger};
use waste_storage::memory::InMemoryWasteStorage;
use waste_types::{
    Category, CategoryTotals, CellEdit, MaterialTaxonomy, NewDailyEntry, SummaryStatus, TenantId,
};

fn tenant_one() -> TenantId {
    TenantId::new("1")
}

fn entry(day: u32, hour: u32, category: Category, material: &str, kg: f64) -> NewDailyEntry {
    NewDailyEntry {
        timestamp: Utc.with_ymd_and_hms(2025, 1, day, hour, 0, 0).unwrap(),
        category,
        material: material.to_string(),
        kg,
        location: "Planta 1".to_string(),
        notes: None,
    }
}

#[tokio::test]
async fn matrix_cell_feeds_row_and_column_totals() {
    let ledger = WasteLedger::in_memory();
    ledger
        .upsert_cell(
            &tenant_one(),
            2025,
            CellEdit::new(3, Category::Recycling, "Cartón", 150.0),
        )
        .await
        .unwrap();

    let row = ledger
        .row_total(&tenant_one(), 2025, Category::Recycling, "Cartón")
        .await
        .unwrap();
    assert!(row >= 150.0);

    let column = ledger
        .category_month_total(&tenant_one(), 2025, 3, Category::Recycling)
        .await
        .unwrap();
    assert!(column >= 150.0);

    let totals = ledger.matrix_totals(&tenant_one(), 2025).await.unwrap();
    assert_eq!(totals.grand_total, 150.0);
    assert_eq!(totals.diversion_index, 100.0);
}

#[tokio::test]
async fn daily_totals_for_one_day() {
    let ledger = WasteLedger::in_memory();
    for observation in [
        entry(10, 8, Category::Recycling, "Cartón", 5.0),
        entry(10, 12, Category::Compost, "Residuos de cocina", 3.0),
        entry(10, 16, Category::Landfill, "Residuos sanitarios", 2.0),
    ] {
        ledger
            .record_daily_entry(&tenant_one(), observation)
            .await
            .unwrap();
    }

    let totals = ledger
        .daily_totals(&tenant_one(), NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
        .await
        .unwrap();
    assert_eq!(
        totals,
        CategoryTotals {
            recycling: 5.0,
            compost: 3.0,
            reuse: 0.0,
            landfill: 2.0,
        }
    );
    assert_eq!(totals.total(), 10.0);
}

#[test]
fn half_circular_month_scores_fifty_percent() {
    let month = CategoryTotals {
        recycling: 600.0,
        compost: 400.0,
        reuse: 0.0,
        landfill: 1000.0,
    };
    assert_eq!(month.circular(), 1000.0);
    assert_eq!(month.total(), 2000.0);
    assert_eq!(aggregator::diversion_index(month.circular(), month.landfill), 50.0);
}

#[tokio::test]
async fn repeated_transfer_returns_the_same_record() {
    let ledger = WasteLedger::in_memory();
    ledger
        .record_daily_entry(&tenant_one(), entry(15, 9, Category::Reuse, "Mobiliario", 40.0))
        .await
        .unwrap();
    ledger
        .close_month(&tenant_one(), 2025, 1, "auditor")
        .await
        .unwrap();

    let first = ledger.transfer_month(&tenant_one(), 2025, 1).await.unwrap();
    let second = ledger.transfer_month(&tenant_one(), 2025, 1).await.unwrap();
    assert_eq!(first.record_id, second.record_id);
    assert_eq!(first, second);

    let archive = ledger.list_official_records(&tenant_one(), 2025).await.unwrap();
    assert_eq!(archive.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_closes_yield_exactly_one_winner() {
    let ledger = Arc::new(WasteLedger::in_memory());
    ledger
        .record_daily_entry(&tenant_one(), entry(2, 9, Category::Recycling, "Papel", 8.0))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for n in 0..8 {
        let ledger = Arc::clone(&ledger);
        handles.push(tokio::spawn(async move {
            ledger
                .close_month(&tenant_one(), 2025, 1, &format!("closer-{n}"))
                .await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(summary) => {
                assert_eq!(summary.status, SummaryStatus::Closed);
                winners += 1;
            }
            Err(LedgerError::StateTransition(TransitionRejection::AlreadyClosed))
            | Err(LedgerError::ConcurrencyConflict(_)) => {}
            Err(other) => panic!("unexpected close failure: {other}"),
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_transfers_write_one_record() {
    let ledger = Arc::new(WasteLedger::in_memory());
    ledger
        .record_daily_entry(&tenant_one(), entry(2, 9, Category::Landfill, "Unicel", 3.0))
        .await
        .unwrap();
    ledger
        .close_month(&tenant_one(), 2025, 1, "auditor")
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ledger = Arc::clone(&ledger);
        handles.push(tokio::spawn(async move {
            ledger.transfer_month(&tenant_one(), 2025, 1).await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().record_id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(
        ledger
            .list_official_records(&tenant_one(), 2025)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn entries_racing_a_close_are_frozen_or_refused() {
    for round in 0..50 {
        let ledger = Arc::new(WasteLedger::in_memory());
        ledger
            .record_daily_entry(&tenant_one(), entry(3, 7, Category::Compost, "Residuos de cocina", 5.0))
            .await
            .unwrap();

        let mut appends = Vec::new();
        for hour in 0..6 {
            let ledger = Arc::clone(&ledger);
            appends.push(tokio::spawn(async move {
                ledger
                    .record_daily_entry(&tenant_one(), entry(4, hour, Category::Recycling, "PET", 1.5))
                    .await
            }));
        }
        let closer = {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move {
                ledger
                    .close_month(&tenant_one(), 2025, 1, &format!("closer-{round}"))
                    .await
            })
        };

        for handle in appends {
            match handle.await.unwrap() {
                Ok(_)
                | Err(LedgerError::StateTransition(TransitionRejection::AlreadyClosed))
                | Err(LedgerError::ConcurrencyConflict(_)) => {}
                Err(other) => panic!("unexpected append failure: {other}"),
            }
        }
        match closer.await.unwrap() {
            Ok(_) | Err(LedgerError::ConcurrencyConflict(_)) => {}
            Err(other) => panic!("unexpected close failure: {other}"),
        }

        let summary = ledger
            .get_monthly_summary(&tenant_one(), 2025, 1)
            .await
            .unwrap();
        let stored = ledger.monthly_entries(&tenant_one(), 2025, 1).await.unwrap();
        if summary.status == SummaryStatus::Closed {
            assert_eq!(summary.daily_entries_count, stored.len());
            assert_eq!(summary.totals, aggregator::totals_from_entries(&stored).totals);
        }
    }
}

#[tokio::test]
async fn custom_taxonomy_governs_validation() {
    let mut lists = std::collections::BTreeMap::new();
    lists.insert(Category::Recycling, vec!["Latas".to_string()]);
    lists.insert(Category::Compost, vec!["Hojas".to_string()]);
    lists.insert(Category::Reuse, vec!["Cajas".to_string()]);
    lists.insert(Category::Landfill, vec!["Otros".to_string()]);
    let taxonomy = MaterialTaxonomy::from_lists(lists).unwrap();
    let ledger = WasteLedger::new(Arc::new(InMemoryWasteStorage::new()), taxonomy);

    assert!(ledger
        .upsert_cell(&tenant_one(), 2025, CellEdit::new(1, Category::Recycling, "Latas", 2.0))
        .await
        .is_ok());
    assert!(matches!(
        ledger
            .upsert_cell(&tenant_one(), 2025, CellEdit::new(1, Category::Recycling, "Cartón", 2.0))
            .await,
        Err(LedgerError::Validation(_))
    ));
}
