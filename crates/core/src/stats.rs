//! Dashboard summary statistics over the project table.

use crate::number::{number_or_zero, round_to};
use crate::table::ProjectTable;
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

fn payment_regex() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new("(?i)payment").expect("valid regex"))
}

/// Month label reported when the table has no payment column.
pub const NO_MONTH: &str = "N/A";

/// Summary figures shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total_count: usize,
    pub total_capacity: f64,
    /// Display month to summed payment, in column order.
    pub monthly_payments: IndexMap<String, f64>,
    pub available_months: Vec<String>,
    /// Display month of the right-most payment column.
    ///
    /// Assumes payment columns are appended left to right in calendar
    /// order; the column name is never parsed as a date.
    pub latest_month: String,
    pub latest_payment: f64,
}

/// Compute dashboard statistics.
pub fn compute_stats(table: &ProjectTable) -> Stats {
    let total_count = match table.find_column(&["plant type"]) {
        Some(col) => table
            .column_values(col)
            .filter(|v| !v.trim().is_empty())
            .count(),
        None => table.len(),
    };

    let total_capacity = table
        .find_column(&["capacity", "mw"])
        .map(|col| round_to(sum_column(table, col), 2))
        .unwrap_or(0.0);

    let mut monthly_payments = IndexMap::new();
    let mut latest: Option<(String, f64)> = None;
    for col in table.columns.iter().filter(|c| c.to_lowercase().contains("payment")) {
        let key = month_key(col);
        let total = round_to(sum_column(table, col), 2);
        latest = Some((key.clone(), total));
        monthly_payments.insert(key, total);
    }

    let available_months = monthly_payments.keys().cloned().collect();
    let (latest_month, latest_payment) = latest.unwrap_or_else(|| (NO_MONTH.to_string(), 0.0));

    Stats {
        total_count,
        total_capacity,
        monthly_payments,
        available_months,
        latest_month,
        latest_payment,
    }
}

fn sum_column(table: &ProjectTable, col: &str) -> f64 {
    table.column_values(col).map(number_or_zero).sum()
}

/// Derive a display month from a payment column name.
///
/// `"April-25 Payment"` becomes `"April-25"`: the word "payment" is removed
/// wherever it occurs, separators are trimmed from both ends, and the rest
/// is title-cased.
pub fn month_key(column: &str) -> String {
    let stripped = payment_regex().replace_all(column, "");
    title_case(stripped.trim_matches(|c| c == ' ' || c == '-' || c == '_'))
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
