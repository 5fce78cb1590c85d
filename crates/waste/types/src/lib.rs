//! Waste ledger domain types.
//!
//! Everything the ledger persists or returns is defined here:
//! - the fixed material taxonomy (four categories, each with its material list)
//! - tenant and period identity
//! - annual matrix cells and the edits that write them
//! - append-only daily waste entries
//! - monthly summaries and their OPEN → CLOSED → TRANSFERRED status
//! - immutable official deviation records
//!
//! These are plain data structures. Aggregation, lifecycle enforcement and
//! persistence live in `waste-ledger` and `waste-storage`.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod entry;
mod error;
mod ids;
mod matrix;
mod official;
mod period;
mod summary;
mod taxonomy;

pub use entry::{DailyWasteEntry, EntryId, NewDailyEntry};
pub use error::{validate_cell_weight, validate_entry_weight, ValidationError, MAX_WEIGHT_KG};
pub use ids::TenantId;
pub use matrix::{CellEdit, CellKey, LedgerCell, YearMatrix};
pub use official::{OfficialDeviationRecord, OfficialRecordId};
pub use period::{
    month_from_number, validate_month, validate_year, Period, MAX_YEAR, MIN_YEAR, MONTHS_PER_YEAR,
};
pub use summary::{CategoryBreakdowns, CategoryTotals, MonthlySummary, MonthlyTotals, SummaryStatus};
pub use taxonomy::{Category, MaterialTaxonomy};
