//! Waste Daemon library
//!
//! This module provides the core components for the waste ledger daemon:
//! - REST API handlers over the ledger operations
//! - Configuration loading
//! - Server lifecycle management

pub mod api;
pub mod config;
pub mod error;
pub mod server;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError};
pub use server::Server;
