//! Waste Ledger - annual waste accounting with a monthly close/transfer
//! certification workflow.
//!
//! The ledger sits on top of any [`WasteStorage`] backend and owns the rules:
//! - the annual matrix accepts only taxonomy materials and finite,
//!   non-negative weights, and batches are applied all-or-nothing
//! - every total is recomputed by the [`aggregator`]; none is ever accepted
//!   from a caller
//! - months move OPEN → CLOSED → TRANSFERRED and never back
//! - a transfer writes exactly one official record per tenant-month
//!
//! Tenant identity is an explicit argument on every operation.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod aggregator;
mod archive;
mod daily;
mod error;
mod lifecycle;
mod matrix;

pub use aggregator::{CategoryMonthTotals, MatrixTotals, RowTotal};
pub use archive::compute_record_hash;
pub use error::{BatchValidationReport, EditFailure, LedgerError, LedgerResult, TransitionRejection};

use std::sync::Arc;
use waste_storage::memory::InMemoryWasteStorage;
use waste_storage::WasteStorage;
use waste_types::MaterialTaxonomy;

/// The waste ledger facade.
///
/// Cheap to clone; clones share the same storage backend and taxonomy.
#[derive(Clone)]
pub struct WasteLedger {
    storage: Arc<dyn WasteStorage>,
    taxonomy: Arc<MaterialTaxonomy>,
}

impl WasteLedger {
    /// Create a ledger over an explicit storage backend.
    pub fn new(storage: Arc<dyn WasteStorage>, taxonomy: MaterialTaxonomy) -> Self {
        Self {
            storage,
            taxonomy: Arc::new(taxonomy),
        }
    }

    /// Ephemeral ledger with the standard taxonomy, for tests and demos.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryWasteStorage::new()),
            MaterialTaxonomy::standard(),
        )
    }

    pub fn taxonomy(&self) -> &MaterialTaxonomy {
        &self.taxonomy
    }

    /// Access the underlying storage backend.
    pub fn storage(&self) -> Arc<dyn WasteStorage> {
        Arc::clone(&self.storage)
    }
}
