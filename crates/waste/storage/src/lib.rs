//! Waste ledger storage abstractions.
//!
//! This crate defines the persistence contract the ledger is written against:
//! - annual matrix cells with all-or-nothing batch writes
//! - the append-only daily entry log
//! - monthly summary rows with compare-and-swap lifecycle transitions
//! - the write-once official record archive
//!
//! Two adapters ship with it. [`memory::InMemoryWasteStorage`] is ephemeral
//! and meant for tests and demos; `postgres::PostgresWasteStorage` (feature
//! `postgres`) is the durable transactional backend. Callers pick one
//! explicitly and hand it to the ledger.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
mod model;
mod traits;

pub use error::{StorageError, StorageResult};
pub use model::{SummaryClose, SummaryRecord};
pub use traits::{DailyEntryStore, MatrixStore, OfficialRecordStore, SummaryStore, WasteStorage};
