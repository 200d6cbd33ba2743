//! # ledgerline-store
//!
//! Access to the spreadsheet that holds the ledgers.
//!
//! [`TabularStore`] is the seam the service talks to. [`SheetsStore`] speaks
//! the Google Sheets v4 REST API; [`MemoryStore`] keeps tables in process for
//! local runs and tests. Cells are always read back as display strings.

pub mod address;
pub mod credentials;
mod error;
pub mod memory;
pub mod sheets;

use async_trait::async_trait;
use ledgerline_core::{CellValue, CellWrite};

pub use credentials::{CredentialSource, Credentials, ServiceAccount, TokenProvider};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sheets::{SheetsConfig, SheetsStore};

/// A named group of tables (one spreadsheet), opened once.
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Table titles in the store's own enumeration order.
    async fn list_tables(&self) -> StoreResult<Vec<String>>;

    /// All cells of a table, row-major. Rows may be ragged.
    async fn get_table(&self, table: &str) -> StoreResult<Vec<Vec<String>>>;

    /// All cells of one column, top to bottom.
    async fn get_column(&self, table: &str, index: usize) -> StoreResult<Vec<String>>;

    /// Append one row after the last non-empty row, as a single write.
    async fn append_row(&self, table: &str, row: &[CellValue]) -> StoreResult<()>;

    /// Write individual cells, as a single batch.
    async fn write_cells(&self, table: &str, cells: &[CellWrite]) -> StoreResult<()>;
}
