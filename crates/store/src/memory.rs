//! In-process [`TabularStore`] for local runs and tests.

use crate::error::{StoreError, StoreResult};
use crate::TabularStore;
use async_trait::async_trait;
use indexmap::IndexMap;
use ledgerline_core::{CellValue, CellWrite};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Tables held in memory, in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<IndexMap<String, Vec<Vec<String>>>>,
    offline: AtomicBool,
    table_reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from `(title, rows)` pairs.
    pub fn with_tables<I, T, R, C>(tables: I) -> Self
    where
        I: IntoIterator<Item = (T, Vec<R>)>,
        T: Into<String>,
        R: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let tables = tables
            .into_iter()
            .map(|(title, rows)| {
                let rows = rows
                    .into_iter()
                    .map(|row| row.into_iter().map(Into::into).collect())
                    .collect();
                (title.into(), rows)
            })
            .collect();
        Self {
            tables: RwLock::new(tables),
            ..Self::default()
        }
    }

    /// Make every call fail as if the backend were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `get_table` calls served so far.
    pub fn table_reads(&self) -> usize {
        self.table_reads.load(Ordering::SeqCst)
    }

    /// Snapshot of one table's rows.
    pub async fn rows(&self, table: &str) -> Option<Vec<Vec<String>>> {
        self.tables.read().await.get(table).cloned()
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                status: 503,
                message: "store offline".to_string(),
            });
        }
        Ok(())
    }
}

fn not_found(table: &str) -> StoreError {
    StoreError::TableNotFound {
        name: table.to_string(),
    }
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn list_tables(&self) -> StoreResult<Vec<String>> {
        self.check_online()?;
        Ok(self.tables.read().await.keys().cloned().collect())
    }

    async fn get_table(&self, table: &str) -> StoreResult<Vec<Vec<String>>> {
        self.table_reads.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .ok_or_else(|| not_found(table))
    }

    async fn get_column(&self, table: &str, index: usize) -> StoreResult<Vec<String>> {
        self.check_online()?;
        let tables = self.tables.read().await;
        let rows = tables.get(table).ok_or_else(|| not_found(table))?;
        Ok(rows
            .iter()
            .map(|row| row.get(index).cloned().unwrap_or_default())
            .collect())
    }

    async fn append_row(&self, table: &str, row: &[CellValue]) -> StoreResult<()> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        let rows = tables.get_mut(table).ok_or_else(|| not_found(table))?;
        rows.push(row.iter().map(ToString::to_string).collect());
        Ok(())
    }

    async fn write_cells(&self, table: &str, cells: &[CellWrite]) -> StoreResult<()> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        let rows = tables.get_mut(table).ok_or_else(|| not_found(table))?;
        for cell in cells {
            if rows.len() <= cell.row {
                rows.resize_with(cell.row + 1, Vec::new);
            }
            let row = &mut rows[cell.row];
            if row.len() <= cell.col {
                row.resize(cell.col + 1, String::new());
            }
            row[cell.col] = cell.value.to_string();
        }
        Ok(())
    }
}
