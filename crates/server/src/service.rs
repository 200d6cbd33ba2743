//! Request orchestration between the store, the cache and the ledger engine.

use crate::cache::TableCache;
use crate::config::TableNames;
use indexmap::IndexMap;
use ledgerline_core::header::data_rows;
use ledgerline_core::{
    append_reading, compute_stats, plan_update, resolve, BillComputation, CellValue, LedgerError,
    LedgerResult, ProjectTable, Reading, Schema, Stats,
};
use ledgerline_report::render_report;
use ledgerline_store::TabularStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// A project's ledger as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct History {
    pub sheet: String,
    pub columns: Vec<String>,
    /// Data rows, positionally aligned with `columns`.
    pub rows: Vec<Vec<String>>,
}

/// Outcome of appending a reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddedReading {
    pub sheet: String,
    /// One-based row number of the baseline the reading was derived from.
    pub baseline_row: usize,
    pub bill_amount: i64,
    pub computation: BillComputation,
}

/// Outcome of a raw row patch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowUpdate {
    pub sheet: String,
    /// One-based row number of the patched row.
    pub row: usize,
    pub updated: usize,
    pub ignored: Vec<String>,
}

/// Everything a request handler needs, shared across requests.
pub struct LedgerService {
    store: Arc<dyn TabularStore>,
    tables: TableNames,
    cache: TableCache,
}

impl LedgerService {
    pub fn new(store: Arc<dyn TabularStore>, tables: TableNames, cache_ttl: Duration) -> Self {
        Self {
            store,
            tables,
            cache: TableCache::new(cache_ttl),
        }
    }

    /// The flattened project table, from cache when fresh.
    pub async fn projects(&self) -> LedgerResult<Arc<ProjectTable>> {
        let store = Arc::clone(&self.store);
        let table = self.tables.projects.clone();
        self.cache
            .get_or_refresh(|| async move {
                let rows = store.get_table(&table).await?;
                Ok::<_, LedgerError>(ProjectTable::from_rows(&rows))
            })
            .await
    }

    pub async fn columns(&self) -> LedgerResult<Vec<String>> {
        Ok(self.projects().await?.columns.clone())
    }

    pub async fn stats(&self) -> LedgerResult<Stats> {
        let table = self.projects().await?;
        Ok(compute_stats(&table))
    }

    /// Whether `employee_id` appears in the whitelist's first column.
    pub async fn verify_employee(&self, employee_id: &str) -> LedgerResult<bool> {
        let wanted = employee_id.trim();
        if wanted.is_empty() {
            return Ok(false);
        }
        let ids = self.store.get_column(&self.tables.employees, 0).await?;
        Ok(ids.iter().any(|id| id.trim() == wanted))
    }

    pub async fn history(&self, project: &str) -> LedgerResult<History> {
        let sheet = self.resolve_sheet(project).await?;
        let rows = self.store.get_table(&sheet).await?;
        let columns = Schema::from_rows(&rows).names();
        let rows = data_rows(&rows).map(|(_, row)| row.to_vec()).collect();
        Ok(History { sheet, columns, rows })
    }

    /// Derive and append a new reading to the project's ledger.
    pub async fn add_reading(&self, project: &str, reading: &Reading) -> LedgerResult<AddedReading> {
        let sheet = self.resolve_sheet(project).await?;
        let rows = self.store.get_table(&sheet).await?;
        let outcome = append_reading(&rows, reading)?;

        self.store.append_row(&sheet, &outcome.row).await?;
        self.cache.invalidate().await;

        tracing::info!(
            project,
            sheet = %sheet,
            period = %reading.date,
            bill = outcome.computation.bill_amount,
            "appended reading"
        );
        Ok(AddedReading {
            sheet,
            baseline_row: outcome.baseline.row + 1,
            bill_amount: outcome.computation.bill_amount,
            computation: outcome.computation,
        })
    }

    /// Patch cells of the row labelled `period_label`, without recomputing anything.
    pub async fn update_row(
        &self,
        project: &str,
        period_label: &str,
        updates: &IndexMap<String, CellValue>,
    ) -> LedgerResult<RowUpdate> {
        let sheet = self.resolve_sheet(project).await?;
        let rows = self.store.get_table(&sheet).await?;
        let patch = plan_update(&rows, period_label, updates)?;

        if !patch.writes.is_empty() {
            self.store.write_cells(&sheet, &patch.writes).await?;
            self.cache.invalidate().await;
        }
        if !patch.ignored.is_empty() {
            tracing::debug!(ignored = ?patch.ignored, "update fields without a matching column");
        }

        tracing::info!(project, sheet = %sheet, period = period_label, updated = patch.updated(), "patched row");
        Ok(RowUpdate {
            sheet,
            row: patch.row + 1,
            updated: patch.updated(),
            ignored: patch.ignored,
        })
    }

    /// Xlsx report of the chosen columns of the project table.
    pub async fn report(&self, columns: &[String]) -> LedgerResult<Vec<u8>> {
        let table = self.projects().await?;
        render_report(&table, columns).map_err(|e| LedgerError::upstream(format!("report generation failed: {e}")))
    }

    async fn resolve_sheet(&self, project: &str) -> LedgerResult<String> {
        let titles = self.store.list_tables().await?;
        let sheet = resolve(project, &titles)
            .ok_or_else(|| LedgerError::not_found(format!("no worksheet matches project '{}'", project.trim())))?;
        tracing::debug!(project, sheet, "resolved worksheet");
        Ok(sheet.to_string())
    }
}
