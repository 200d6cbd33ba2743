//! # ledgerline-report
//!
//! Builds the downloadable xlsx report: a single worksheet holding the
//! requested columns of the project table, header row first.

use ledgerline_core::ProjectTable;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use thiserror::Error;

/// Worksheet name used in generated reports.
pub const REPORT_SHEET: &str = "Custom Report";

/// File name suggested to the browser.
pub const REPORT_FILE_NAME: &str = "Project_Report.xlsx";

/// MIME type of the generated file.
pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Errors that can occur while writing a report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Row index overflow: {0}")]
    RowOverflow(usize),

    #[error("Column index overflow: {0}")]
    ColumnOverflow(usize),

    #[error("Xlsx error: {0}")]
    Xlsx(#[from] XlsxError),
}

pub type Result<T> = std::result::Result<T, ReportError>;

/// Render the selected columns of `table` as an xlsx workbook.
///
/// Columns keep the requested order; names the table does not have are
/// skipped. Cells that parse as plain numbers are written as numbers.
pub fn render_report(table: &ProjectTable, columns: &[String]) -> Result<Vec<u8>> {
    let selected = table.select(columns);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(REPORT_SHEET)?;
    write_table(worksheet, &selected)?;

    Ok(workbook.save_to_buffer()?)
}

fn write_table(worksheet: &mut Worksheet, table: &ProjectTable) -> Result<()> {
    let header = Format::new().set_bold();

    for (col_idx, name) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col_num(col_idx)?, name, &header)?;
    }

    for (row_idx, record) in table.records.iter().enumerate() {
        let row_num = u32::try_from(row_idx + 1).map_err(|_| ReportError::RowOverflow(row_idx))?;
        for (col_idx, value) in record.values().enumerate() {
            let col_num = col_num(col_idx)?;
            match plain_number(value) {
                Some(n) => worksheet.write_number(row_num, col_num, n)?,
                None if value.is_empty() => continue,
                None => worksheet.write_string(row_num, col_num, value)?,
            };
        }
    }

    Ok(())
}

fn col_num(index: usize) -> Result<u16> {
    u16::try_from(index).map_err(|_| ReportError::ColumnOverflow(index))
}

/// Numbers written without separators, so identifiers like "007" or
/// "1,200 (est.)" stay text.
fn plain_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() || (trimmed.len() > 1 && trimmed.starts_with('0') && !trimmed.starts_with("0.")) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}
