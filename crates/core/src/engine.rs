//! Incremental billing over a project's ledger worksheet.
//!
//! Every ledger row follows a fixed positional layout (see [`position`]).
//! A new reading is derived from the most recent row whose multiplication
//! factor parses as a number; that row's *current* meter readings become
//! the new row's *previous* readings, and the multiplication factor and
//! tariff are carried forward unchanged. The row written back follows the
//! same layout, so it is itself a valid baseline for the next reading.

use crate::cell::{CellValue, CellWrite};
use crate::error::{LedgerError, LedgerResult};
use crate::header::{data_rows, Schema, HEADER_ROWS};
use crate::number::parse_number;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Column positions of a ledger row.
pub mod position {
    pub const PERIOD: usize = 0;
    pub const MF: usize = 1;
    pub const PREV_EXPORT: usize = 2;
    pub const CURR_EXPORT: usize = 3;
    pub const EXPORT_DELTA: usize = 4;
    pub const EXPORT_ENERGY: usize = 5;
    pub const PREV_IMPORT: usize = 6;
    pub const CURR_IMPORT: usize = 7;
    pub const IMPORT_DELTA: usize = 8;
    pub const IMPORT_ENERGY: usize = 9;
    pub const NET_EXPORT: usize = 10;
    pub const RATE: usize = 11;
    pub const BILL: usize = 12;
    pub const POWER_FACTOR: usize = 13;
    pub const INVOICE_NO: usize = 14;
    pub const INVOICE_DATE: usize = 15;
    pub const SUBMISSION_DATE: usize = 16;
    pub const VERIFICATION_DATE: usize = 17;
    pub const REMARKS: usize = 18;

    /// Width of a freshly written row.
    pub const ROW_WIDTH: usize = 19;
    /// Rows narrower than this cannot serve as a baseline.
    pub const MIN_BASELINE_WIDTH: usize = 12;
}

/// A new meter reading as entered by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Period label written to the first column (e.g. `"Apr-25"`).
    pub date: String,
    pub current_export: f64,
    pub current_import: f64,
    #[serde(default)]
    pub power_factor: Option<String>,
    #[serde(default)]
    pub invoice_no: Option<String>,
    #[serde(default)]
    pub invoice_date: Option<String>,
    #[serde(default)]
    pub submission_date: Option<String>,
    #[serde(default)]
    pub verification_date: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// Values carried over from the most recent valid ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Baseline {
    /// Absolute row index of the baseline within the worksheet.
    pub row: usize,
    pub mf: f64,
    pub current_export: f64,
    pub current_import: f64,
    pub rate: f64,
}

/// Every derived quantity of a new reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BillComputation {
    pub mf: f64,
    pub rate: f64,
    pub prev_export: f64,
    pub current_export: f64,
    pub diff_export: f64,
    pub energy_export: f64,
    pub prev_import: f64,
    pub current_import: f64,
    pub diff_import: f64,
    pub energy_import: f64,
    pub net_export: f64,
    pub bill_amount: i64,
}

impl BillComputation {
    /// Derive a reading's quantities from its baseline.
    pub fn derive(baseline: &Baseline, current_export: f64, current_import: f64) -> Self {
        let prev_export = baseline.current_export;
        let prev_import = baseline.current_import;
        let diff_export = current_export - prev_export;
        let energy_export = diff_export * baseline.mf;
        let diff_import = current_import - prev_import;
        let energy_import = diff_import * baseline.mf;
        let net_export = energy_export - energy_import;
        let bill_amount = (net_export * baseline.rate).round_ties_even() as i64;

        Self {
            mf: baseline.mf,
            rate: baseline.rate,
            prev_export,
            current_export,
            diff_export,
            energy_export,
            prev_import,
            current_import,
            diff_import,
            energy_import,
            net_export,
            bill_amount,
        }
    }
}

/// Result of appending a reading: the row to persist and what it was built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppendOutcome {
    pub baseline: Baseline,
    pub computation: BillComputation,
    pub row: Vec<CellValue>,
}

/// Find the most recent row usable as a billing baseline.
///
/// Rows are scanned from the bottom up, skipping the header rows and any
/// row narrower than [`position::MIN_BASELINE_WIDTH`]. The first row whose
/// multiplication factor parses as a number is the baseline, which steps
/// over trailing totals and notes. Its meter readings and tariff must then
/// parse as well.
pub fn find_baseline<S: AsRef<str>>(rows: &[Vec<S>]) -> LedgerResult<Baseline> {
    let (row_index, row, mf) = rows
        .iter()
        .enumerate()
        .skip(HEADER_ROWS)
        .rev()
        .filter(|(_, row)| row.len() >= position::MIN_BASELINE_WIDTH)
        .find_map(|(i, row)| parse_number(row[position::MF].as_ref()).map(|mf| (i, row, mf)))
        .ok_or_else(|| LedgerError::validation("no ledger row with a numeric multiplication factor"))?;

    let field = |pos: usize, label: &str| -> LedgerResult<f64> {
        let raw = row[pos].as_ref();
        parse_number(raw).ok_or_else(|| {
            LedgerError::validation(format!(
                "baseline row {} has a non-numeric {label}: '{raw}'",
                row_index + 1
            ))
        })
    };

    Ok(Baseline {
        row: row_index,
        mf,
        current_export: field(position::CURR_EXPORT, "current export reading")?,
        current_import: field(position::CURR_IMPORT, "current import reading")?,
        rate: field(position::RATE, "tariff rate")?,
    })
}

/// Compute the ledger row for a new reading.
pub fn append_reading<S: AsRef<str>>(rows: &[Vec<S>], reading: &Reading) -> LedgerResult<AppendOutcome> {
    let baseline = find_baseline(rows)?;
    let computation = BillComputation::derive(&baseline, reading.current_export, reading.current_import);
    tracing::debug!(
        baseline_row = baseline.row,
        net_export = computation.net_export,
        bill = computation.bill_amount,
        "derived ledger reading"
    );
    let row = build_row(reading, &computation);
    Ok(AppendOutcome {
        baseline,
        computation,
        row,
    })
}

fn build_row(reading: &Reading, c: &BillComputation) -> Vec<CellValue> {
    let meta = |value: &Option<String>| CellValue::text(value.clone().unwrap_or_default());

    let row = vec![
        CellValue::text(reading.date.clone()),
        CellValue::Float(c.mf),
        CellValue::Float(c.prev_export),
        CellValue::Float(c.current_export),
        CellValue::Float(c.diff_export),
        CellValue::Float(c.energy_export),
        CellValue::Float(c.prev_import),
        CellValue::Float(c.current_import),
        CellValue::Float(c.diff_import),
        CellValue::Float(c.energy_import),
        CellValue::Float(c.net_export),
        CellValue::Float(c.rate),
        CellValue::Int(c.bill_amount),
        meta(&reading.power_factor),
        meta(&reading.invoice_no),
        meta(&reading.invoice_date),
        meta(&reading.submission_date),
        meta(&reading.verification_date),
        meta(&reading.remarks),
    ];
    debug_assert_eq!(row.len(), position::ROW_WIDTH);
    row
}

/// Staged single-cell writes for one ledger row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowPatch {
    /// Absolute row index of the patched row.
    pub row: usize,
    pub writes: Vec<CellWrite>,
    /// Field names that matched no column.
    pub ignored: Vec<String>,
}

impl RowPatch {
    /// Number of cells that will be written.
    pub fn updated(&self) -> usize {
        self.writes.len()
    }
}

/// Plan a raw cell patch of the row labelled `period_label`.
///
/// The first data row whose period cell equals the label (both trimmed) is
/// patched. A blank label matches nothing, and blank spacer rows are never
/// candidates. Field names are matched against the worksheet's own flattened
/// headers; unknown names are skipped. Derived columns are not recomputed:
/// changing a meter reading here leaves the stored bill untouched.
pub fn plan_update<S: AsRef<str>>(
    rows: &[Vec<S>],
    period_label: &str,
    updates: &IndexMap<String, CellValue>,
) -> LedgerResult<RowPatch> {
    let label = period_label.trim();
    let row = data_rows(rows)
        .filter(|_| !label.is_empty())
        .find(|(_, row)| {
            row.get(position::PERIOD)
                .is_some_and(|cell| cell.as_ref().trim() == label)
        })
        .map(|(i, _)| i)
        .ok_or_else(|| LedgerError::not_found(format!("no ledger row for period '{label}'")))?;

    let schema = Schema::from_rows(rows);
    let columns = schema.index_map();

    let mut writes = Vec::new();
    let mut ignored = Vec::new();
    for (name, value) in updates {
        match columns.get(name.trim()) {
            Some(&col) => writes.push(CellWrite::new(row, col, value.clone())),
            None => ignored.push(name.clone()),
        }
    }

    Ok(RowPatch { row, writes, ignored })
}
