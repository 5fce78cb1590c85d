use crate::aggregator::{self, MatrixTotals};
use crate::{BatchValidationReport, EditFailure, LedgerError, LedgerResult, WasteLedger};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use waste_types::{validate_month, validate_year, Category, CellEdit, CellKey, TenantId, YearMatrix};

impl WasteLedger {
    /// Every stored cell of a tenant-year plus the taxonomy.
    pub async fn get_year_matrix(&self, tenant: &TenantId, year: i32) -> LedgerResult<YearMatrix> {
        validate_year(year)?;
        let cells = self.storage.list_cells(tenant, year).await?;
        debug!(tenant = %tenant, year, cells = cells.len(), "loaded year matrix");
        Ok(YearMatrix::new(
            tenant.clone(),
            year,
            cells,
            self.taxonomy.as_ref().clone(),
        ))
    }

    /// Replace one cell's value.
    ///
    /// Fails with the specific input error (`InvalidMonth`, `InvalidMaterial`
    /// or `InvalidWeight`) and writes nothing when the edit is malformed.
    pub async fn upsert_cell(&self, tenant: &TenantId, year: i32, edit: CellEdit) -> LedgerResult<()> {
        validate_year(year)?;
        let key = edit.validate(&self.taxonomy)?;
        self.storage
            .upsert_cells(tenant, year, BTreeMap::from([(key.clone(), edit.kg)]), Utc::now())
            .await?;
        info!(tenant = %tenant, year, cell = %key, "matrix cell updated");
        Ok(())
    }

    /// Validate every edit, then apply all of them in one write.
    ///
    /// A single invalid edit rejects the whole batch with a report of every
    /// failure. Repeated keys collapse to the last edit in the batch. Returns
    /// the number of distinct cells written.
    pub async fn batch_upsert(
        &self,
        tenant: &TenantId,
        year: i32,
        edits: Vec<CellEdit>,
    ) -> LedgerResult<usize> {
        validate_year(year)?;

        let mut merged: BTreeMap<CellKey, f64> = BTreeMap::new();
        let mut failures: Vec<EditFailure> = Vec::new();
        for (index, edit) in edits.iter().enumerate() {
            match edit.validate(&self.taxonomy) {
                Ok(key) => {
                    merged.insert(key, edit.kg);
                }
                Err(error) => failures.push(EditFailure {
                    index,
                    edit: edit.clone(),
                    error,
                }),
            }
        }
        if !failures.is_empty() {
            warn!(
                tenant = %tenant,
                year,
                rejected = failures.len(),
                submitted = edits.len(),
                "matrix batch rejected"
            );
            return Err(LedgerError::BatchRejected(BatchValidationReport {
                total_edits: edits.len(),
                failures,
            }));
        }

        let applied = merged.len();
        if applied == 0 {
            return Ok(0);
        }

        self.storage
            .upsert_cells(tenant, year, merged, Utc::now())
            .await?;
        info!(tenant = %tenant, year, cells = applied, "matrix batch applied");
        Ok(applied)
    }

    /// Row, column and grand totals plus the diversion index of a tenant-year.
    pub async fn matrix_totals(&self, tenant: &TenantId, year: i32) -> LedgerResult<MatrixTotals> {
        let matrix = self.get_year_matrix(tenant, year).await?;
        Ok(aggregator::matrix_totals(&matrix))
    }

    /// One material summed over the twelve months.
    pub async fn row_total(
        &self,
        tenant: &TenantId,
        year: i32,
        category: Category,
        material: &str,
    ) -> LedgerResult<f64> {
        let matrix = self.get_year_matrix(tenant, year).await?;
        Ok(aggregator::row_total(&matrix, category, material))
    }

    /// One category summed over its materials for a single month.
    pub async fn category_month_total(
        &self,
        tenant: &TenantId,
        year: i32,
        month: u8,
        category: Category,
    ) -> LedgerResult<f64> {
        validate_month(month)?;
        let matrix = self.get_year_matrix(tenant, year).await?;
        Ok(aggregator::category_month_total(&matrix, month, category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use waste_types::ValidationError;

    fn tenant() -> TenantId {
        TenantId::new("tenant-1")
    }

    #[tokio::test]
    async fn upsert_cell_is_last_write_wins() {
        let ledger = WasteLedger::in_memory();
        ledger
            .upsert_cell(&tenant(), 2025, CellEdit::new(3, Category::Recycling, "Cartón", 100.0))
            .await
            .unwrap();
        ledger
            .upsert_cell(&tenant(), 2025, CellEdit::new(3, Category::Recycling, "Cartón", 150.0))
            .await
            .unwrap();

        let matrix = ledger.get_year_matrix(&tenant(), 2025).await.unwrap();
        assert_eq!(matrix.cells().len(), 1);
        assert_eq!(matrix.cell(3, Category::Recycling, "Cartón"), 150.0);
        assert_eq!(&matrix.taxonomy, ledger.taxonomy());
    }

    #[tokio::test]
    async fn upsert_cell_reports_the_specific_input_error() {
        let ledger = WasteLedger::in_memory();
        let bad_material = ledger
            .upsert_cell(&tenant(), 2025, CellEdit::new(3, Category::Compost, "Cartón", 1.0))
            .await;
        assert!(matches!(
            bad_material,
            Err(LedgerError::Validation(ValidationError::InvalidMaterial { .. }))
        ));

        let bad_month = ledger
            .upsert_cell(&tenant(), 2025, CellEdit::new(0, Category::Recycling, "Cartón", 1.0))
            .await;
        assert!(matches!(
            bad_month,
            Err(LedgerError::Validation(ValidationError::InvalidMonth(0)))
        ));

        let bad_weight = ledger
            .upsert_cell(
                &tenant(),
                2025,
                CellEdit::new(1, Category::Recycling, "Cartón", f64::INFINITY),
            )
            .await;
        assert!(matches!(
            bad_weight,
            Err(LedgerError::Validation(ValidationError::InvalidWeight { .. }))
        ));

        assert!(ledger.get_year_matrix(&tenant(), 2025).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_reports_every_failure_and_writes_nothing() {
        let ledger = WasteLedger::in_memory();
        let result = ledger
            .batch_upsert(
                &tenant(),
                2025,
                vec![
                    CellEdit::new(1, Category::Recycling, "Cartón", 10.0),
                    CellEdit::new(2, Category::Recycling, "Madera", 10.0),
                    CellEdit::new(3, Category::Landfill, "Unicel", -1.0),
                ],
            )
            .await;

        match result {
            Err(LedgerError::BatchRejected(report)) => {
                assert_eq!(report.total_edits, 3);
                let indexes: Vec<usize> = report.failures.iter().map(|f| f.index).collect();
                assert_eq!(indexes, vec![1, 2]);
            }
            other => panic!("expected batch rejection, got {other:?}"),
        }
        assert!(ledger.get_year_matrix(&tenant(), 2025).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn overflowing_weights_never_reach_the_matrix() {
        let ledger = WasteLedger::in_memory();
        let result = ledger
            .batch_upsert(
                &tenant(),
                2025,
                vec![
                    CellEdit::new(1, Category::Recycling, "Cartón", 1.0e308),
                    CellEdit::new(2, Category::Recycling, "Cartón", 1.0e308),
                ],
            )
            .await;
        match result {
            Err(LedgerError::BatchRejected(report)) => {
                assert_eq!(report.failures.len(), 2);
                assert!(report.failures.iter().all(|f| matches!(
                    f.error,
                    ValidationError::InvalidWeight { reason: "weight exceeds maximum", .. }
                )));
            }
            other => panic!("expected batch rejection, got {other:?}"),
        }

        let totals = ledger.matrix_totals(&tenant(), 2025).await.unwrap();
        assert_eq!(totals.grand_total, 0.0);
        assert!(totals.grand_total.is_finite());
    }

    #[tokio::test]
    async fn batch_reports_wide_month_numbers_at_their_index() {
        let ledger = WasteLedger::in_memory();
        let result = ledger
            .batch_upsert(
                &tenant(),
                2025,
                vec![
                    CellEdit::new(4, Category::Reuse, "Mobiliario", 2.0),
                    CellEdit::new(300, Category::Reuse, "Mobiliario", 2.0),
                ],
            )
            .await;
        match result {
            Err(LedgerError::BatchRejected(report)) => {
                assert_eq!(report.failures.len(), 1);
                assert_eq!(report.failures[0].index, 1);
                assert_eq!(report.failures[0].error, ValidationError::InvalidMonth(300));
                assert_eq!(report.failures[0].edit.month, 300);
            }
            other => panic!("expected batch rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn batch_collapses_repeated_keys_to_the_last_edit() {
        let ledger = WasteLedger::in_memory();
        let applied = ledger
            .batch_upsert(
                &tenant(),
                2025,
                vec![
                    CellEdit::new(1, Category::Recycling, "Cartón", 10.0),
                    CellEdit::new(1, Category::Recycling, "Cartón", 12.0),
                    CellEdit::new(1, Category::Reuse, "Mobiliario", 3.0),
                ],
            )
            .await
            .unwrap();
        assert_eq!(applied, 2);
        assert_eq!(
            ledger
                .row_total(&tenant(), 2025, Category::Recycling, "Cartón")
                .await
                .unwrap(),
            12.0
        );
        assert_eq!(ledger.batch_upsert(&tenant(), 2025, Vec::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn tenants_and_years_are_isolated() {
        let ledger = WasteLedger::in_memory();
        ledger
            .upsert_cell(&tenant(), 2025, CellEdit::new(1, Category::Compost, "Posos de café", 8.0))
            .await
            .unwrap();

        let other = TenantId::new("tenant-2");
        assert!(ledger.get_year_matrix(&other, 2025).await.unwrap().is_empty());
        assert!(ledger.get_year_matrix(&tenant(), 2024).await.unwrap().is_empty());
        assert_eq!(
            ledger.matrix_totals(&other, 2025).await.unwrap().grand_total,
            0.0
        );
    }

    fn edit_strategy() -> impl Strategy<Value = CellEdit> {
        let materials = vec![
            (Category::Recycling, "Cartón"),
            (Category::Recycling, "Madera"),
            (Category::Landfill, "Unicel"),
        ];
        (0u8..=13, proptest::sample::select(materials), -5.0f64..500.0).prop_map(
            |(month, (category, material), kg)| CellEdit::new(month, category, material, kg),
        )
    }

    proptest! {
        #[test]
        fn property_batches_are_all_or_nothing(
            seed in proptest::collection::vec(edit_strategy(), 0..8),
            batch in proptest::collection::vec(edit_strategy(), 1..8),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("runtime");

            rt.block_on(async move {
                let ledger = WasteLedger::in_memory();
                let tenant = TenantId::new("prop-tenant");
                let _ = ledger.batch_upsert(&tenant, 2025, seed).await;
                let before = ledger.get_year_matrix(&tenant, 2025).await.expect("matrix");

                let taxonomy = ledger.taxonomy().clone();
                let all_valid = batch.iter().all(|e| e.validate(&taxonomy).is_ok());
                let result = ledger.batch_upsert(&tenant, 2025, batch.clone()).await;
                let after = ledger.get_year_matrix(&tenant, 2025).await.expect("matrix");

                if all_valid {
                    assert!(result.is_ok());
                    for edit in &batch {
                        let last = batch
                            .iter()
                            .rev()
                            .find(|e| e.month == edit.month && e.category == edit.category && e.material == edit.material)
                            .expect("edit");
                        let month = u8::try_from(edit.month).expect("validated month");
                        assert_eq!(after.cell(month, edit.category, &edit.material), last.kg);
                    }
                } else {
                    assert!(matches!(result, Err(LedgerError::BatchRejected(_))));
                    let before_values: Vec<(CellKey, f64)> =
                        before.cells().iter().map(|c| (c.key.clone(), c.kg)).collect();
                    let after_values: Vec<(CellKey, f64)> =
                        after.cells().iter().map(|c| (c.key.clone(), c.kg)).collect();
                    assert_eq!(before_values, after_values);
                }
            });
        }
    }
}
