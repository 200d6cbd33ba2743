//! # ledgerline-core
//!
//! Pure logic behind the ledgerline service.
//!
//! This crate provides:
//! - Flattening of two-row grouped worksheet headers
//! - Project name to worksheet resolution
//! - Baseline selection and incremental billing for ledger rows
//! - The flattened project table and its dashboard statistics
//! - Error types
//!
//! Nothing here performs I/O; rows come in as plain strings.

pub mod cell;
pub mod engine;
/// Error types and result aliases.
pub mod error;
pub mod header;
pub mod number;
pub mod resolver;
pub mod stats;
pub mod table;

pub use cell::{CellValue, CellWrite};
pub use engine::{append_reading, find_baseline, plan_update, AppendOutcome, Baseline, BillComputation, Reading, RowPatch};
pub use error::{LedgerError, LedgerResult};
pub use header::{reconcile, Schema};
pub use resolver::resolve;
pub use stats::{compute_stats, Stats};
pub use table::{ProjectTable, Record};
