//! Pure aggregation over matrix snapshots and daily entries.
//!
//! Nothing here touches storage. Identical inputs always produce identical
//! totals: cells are kept sorted by key and entries are summed in
//! `(timestamp, entry_id)` order, so floating-point summation order is fixed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use waste_types::{
    Category, CategoryTotals, DailyWasteEntry, MonthlyTotals, TenantId, YearMatrix,
    MONTHS_PER_YEAR,
};

/// One material across the twelve months of a year.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowTotal {
    pub category: Category,
    pub material: String,
    /// Index 0 is January
    pub by_month: Vec<f64>,
    pub total: f64,
}

/// One category across the twelve months of a year.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryMonthTotals {
    pub category: Category,
    /// Index 0 is January
    pub by_month: Vec<f64>,
    pub total: f64,
}

/// Every derived figure of a tenant-year, computed from one snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatrixTotals {
    pub tenant: TenantId,
    pub year: i32,
    pub rows: Vec<RowTotal>,
    pub categories: Vec<CategoryMonthTotals>,
    pub category_totals: CategoryTotals,
    pub grand_total: f64,
    pub diversion_index: f64,
}

/// Σ over the twelve months of one material's cells.
pub fn row_total(matrix: &YearMatrix, category: Category, material: &str) -> f64 {
    (1..=MONTHS_PER_YEAR)
        .map(|month| matrix.cell(month, category, material))
        .sum()
}

/// Σ over every material of `category` stored for `month`.
pub fn category_month_total(matrix: &YearMatrix, month: u8, category: Category) -> f64 {
    matrix
        .cells()
        .iter()
        .filter(|c| c.key.month == month && c.key.category == category)
        .map(|c| c.kg)
        .sum()
}

pub fn category_year_total(matrix: &YearMatrix, category: Category) -> f64 {
    (1..=MONTHS_PER_YEAR)
        .map(|month| category_month_total(matrix, month, category))
        .sum()
}

/// Σ over categories of Σ over months of the category-month totals.
pub fn grand_total(matrix: &YearMatrix) -> f64 {
    Category::ALL
        .iter()
        .map(|category| category_year_total(matrix, *category))
        .sum()
}

/// Share of waste kept out of landfill, in percent.
///
/// `circular / (circular + landfill) * 100`, clamped to `[0, 100]`. A zero or
/// non-finite denominator yields 0.
pub fn diversion_index(circular: f64, landfill: f64) -> f64 {
    let total = circular + landfill;
    if total.is_nan() || total <= 0.0 {
        return 0.0;
    }
    let percent = (circular / total) * 100.0;
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

/// Year totals per category.
pub fn matrix_category_totals(matrix: &YearMatrix) -> CategoryTotals {
    let mut totals = CategoryTotals::default();
    for category in Category::ALL {
        totals.add(category, category_year_total(matrix, category));
    }
    totals
}

/// Row, column and grand totals plus the diversion index of a tenant-year.
///
/// Rows cover every taxonomy material, followed by any stored material the
/// current taxonomy no longer lists, so row totals always add up to the
/// category totals.
pub fn matrix_totals(matrix: &YearMatrix) -> MatrixTotals {
    let mut row_keys: Vec<(Category, String)> = matrix
        .taxonomy
        .iter()
        .map(|(category, material)| (category, material.to_string()))
        .collect();
    let unlisted: BTreeSet<(Category, &str)> = matrix
        .cells()
        .iter()
        .filter(|c| !matrix.taxonomy.contains(c.key.category, &c.key.material))
        .map(|c| (c.key.category, c.key.material.as_str()))
        .collect();
    row_keys.extend(unlisted.into_iter().map(|(c, m)| (c, m.to_string())));

    let rows = row_keys
        .into_iter()
        .map(|(category, material)| {
            let by_month: Vec<f64> = (1..=MONTHS_PER_YEAR)
                .map(|month| matrix.cell(month, category, &material))
                .collect();
            RowTotal {
                total: row_total(matrix, category, &material),
                category,
                material,
                by_month,
            }
        })
        .collect();

    let categories = Category::ALL
        .iter()
        .map(|category| CategoryMonthTotals {
            category: *category,
            by_month: (1..=MONTHS_PER_YEAR)
                .map(|month| category_month_total(matrix, month, *category))
                .collect(),
            total: category_year_total(matrix, *category),
        })
        .collect();

    let category_totals = matrix_category_totals(matrix);
    MatrixTotals {
        tenant: matrix.tenant.clone(),
        year: matrix.year,
        rows,
        categories,
        grand_total: grand_total(matrix),
        diversion_index: diversion_index(category_totals.circular(), category_totals.landfill),
        category_totals,
    }
}

fn ordered(entries: &[DailyWasteEntry]) -> Vec<&DailyWasteEntry> {
    let mut sorted: Vec<&DailyWasteEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.entry_id.cmp(&b.entry_id))
    });
    sorted
}

/// Totals, per-material breakdowns and count of a set of entries.
pub fn totals_from_entries(entries: &[DailyWasteEntry]) -> MonthlyTotals {
    let mut out = MonthlyTotals::default();
    for entry in ordered(entries) {
        out.totals.add(entry.category, entry.kg);
        out.breakdowns.add(entry.category, &entry.material, entry.kg);
        out.daily_entries_count += 1;
    }
    out
}

/// Per-category sum of the entries booked on `date` (UTC calendar day).
pub fn daily_totals(entries: &[DailyWasteEntry], date: NaiveDate) -> CategoryTotals {
    let mut totals = CategoryTotals::default();
    for entry in ordered(entries).into_iter().filter(|e| e.date() == date) {
        totals.add(entry.category, entry.kg);
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use waste_types::{CellKey, LedgerCell, MaterialTaxonomy, NewDailyEntry};

    fn matrix_of<S: AsRef<str>>(cells: &[(u8, Category, S, f64)]) -> YearMatrix {
        let now = Utc::now();
        YearMatrix::new(
            TenantId::new("t1"),
            2025,
            cells
                .iter()
                .map(|(month, category, material, kg)| LedgerCell {
                    tenant: TenantId::new("t1"),
                    year: 2025,
                    key: CellKey::new(*month, *category, material.as_ref()),
                    kg: *kg,
                    updated_at: now,
                })
                .collect(),
            MaterialTaxonomy::standard(),
        )
    }

    fn entry(day: u32, hour: u32, category: Category, material: &str, kg: f64) -> DailyWasteEntry {
        DailyWasteEntry::accept(
            TenantId::new("t1"),
            NewDailyEntry {
                timestamp: Utc.with_ymd_and_hms(2025, 1, day, hour, 0, 0).unwrap(),
                category,
                material: material.to_string(),
                kg,
                location: "Patio".to_string(),
                notes: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn diversion_index_matches_reference_month() {
        assert_eq!(diversion_index(1000.0, 1000.0), 50.0);
        assert_eq!(diversion_index(0.0, 0.0), 0.0);
        assert_eq!(diversion_index(10.0, 0.0), 100.0);
        assert_eq!(diversion_index(0.0, 10.0), 0.0);
        assert_eq!(diversion_index(f64::NAN, 1.0), 0.0);
        assert_eq!(diversion_index(f64::INFINITY, 1.0), 0.0);
    }

    #[test]
    fn matrix_totals_cover_every_taxonomy_row() {
        let matrix = matrix_of(&[
            (3, Category::Recycling, "Cartón", 150.0),
            (4, Category::Recycling, "Cartón", 50.0),
            (3, Category::Landfill, "Unicel", 200.0),
        ]);
        let totals = matrix_totals(&matrix);

        assert_eq!(totals.rows.len(), MaterialTaxonomy::standard().iter().count());
        let carton = totals
            .rows
            .iter()
            .find(|r| r.material == "Cartón")
            .unwrap();
        assert_eq!(carton.total, 200.0);
        assert_eq!(carton.by_month[2], 150.0);
        assert_eq!(totals.grand_total, 400.0);
        assert_eq!(totals.category_totals.recycling, 200.0);
        assert_eq!(totals.diversion_index, 50.0);
        assert_eq!(category_month_total(&matrix, 3, Category::Recycling), 150.0);
    }

    #[test]
    fn unlisted_materials_still_get_a_row() {
        let matrix = matrix_of(&[(1, Category::Reuse, "Bicicletas", 7.0)]);
        let totals = matrix_totals(&matrix);
        let last = totals.rows.last().unwrap();
        assert_eq!(last.material, "Bicicletas");
        assert_eq!(last.total, 7.0);
        assert_eq!(totals.grand_total, 7.0);
    }

    #[test]
    fn daily_totals_group_by_category_for_one_day() {
        let entries = vec![
            entry(10, 8, Category::Recycling, "Cartón", 5.0),
            entry(10, 9, Category::Compost, "Residuos de cocina", 3.0),
            entry(10, 17, Category::Landfill, "Basura general", 2.0),
            entry(11, 8, Category::Recycling, "Papel", 40.0),
        ];
        let day = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let totals = daily_totals(&entries, day);
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
    fn entry_totals_include_breakdowns_and_count() {
        let entries = vec![
            entry(3, 8, Category::Recycling, "Cartón", 5.0),
            entry(4, 8, Category::Recycling, "Cartón", 2.5),
            entry(4, 9, Category::Recycling, "PET", 1.0),
        ];
        let totals = totals_from_entries(&entries);
        assert_eq!(totals.daily_entries_count, 3);
        assert_eq!(totals.totals.recycling, 8.5);
        assert_eq!(totals.breakdowns.recycling.get("Cartón"), Some(&7.5));
        assert_eq!(totals.breakdowns.recycling.get("PET"), Some(&1.0));
    }

    fn cell_strategy() -> impl Strategy<Value = (u8, Category, String, f64)> {
        let pairs: Vec<(Category, String)> = MaterialTaxonomy::standard()
            .iter()
            .map(|(c, m)| (c, m.to_string()))
            .collect();
        (1u8..=12, proptest::sample::select(pairs), 0.0f64..10_000.0)
            .prop_map(|(month, (category, material), kg)| (month, category, material, kg))
    }

    proptest! {
        #[test]
        fn property_rows_and_columns_agree(cells in proptest::collection::vec(cell_strategy(), 0..64)) {
            let matrix = matrix_of(&cells);
            let totals = matrix_totals(&matrix);

            for row in &totals.rows {
                let by_month: f64 = row.by_month.iter().sum();
                prop_assert!((row.total - by_month).abs() < 1e-6);
            }

            let from_columns: f64 = Category::ALL
                .iter()
                .flat_map(|c| (1..=12u8).map(move |m| (*c, m)))
                .map(|(c, m)| category_month_total(&matrix, m, c))
                .sum();
            prop_assert!((grand_total(&matrix) - from_columns).abs() < 1e-6);

            let from_rows: f64 = totals.rows.iter().map(|r| r.total).sum();
            prop_assert!((grand_total(&matrix) - from_rows).abs() < 1e-6);
        }

        #[test]
        fn property_diversion_index_is_a_percentage(
            circular in 0.0f64..1e12,
            landfill in 0.0f64..1e12,
        ) {
            let index = diversion_index(circular, landfill);
            prop_assert!((0.0..=100.0).contains(&index));
        }

        #[test]
        fn property_aggregation_is_deterministic(cells in proptest::collection::vec(cell_strategy(), 0..32)) {
            let first = matrix_totals(&matrix_of(&cells));
            let mut reversed = cells.clone();
            reversed.reverse();
            let second = matrix_totals(&matrix_of(&reversed));
            // Duplicate keys may resolve differently when reversed, so only
            // compare inputs that have unique keys.
            let unique: BTreeSet<(u8, Category, &str)> =
                cells.iter().map(|(m, c, n, _)| (*m, *c, n.as_str())).collect();
            if unique.len() == cells.len() {
                prop_assert_eq!(first, second);
            }
        }
    }
}
