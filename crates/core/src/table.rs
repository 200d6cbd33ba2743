//! The flattened aggregate project table.

use crate::header::{data_rows, Schema};
use indexmap::IndexMap;
use serde::Serialize;

/// One project as a name-keyed record, in column order.
pub type Record = IndexMap<String, String>;

/// A grouped table flattened into unique column names and records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectTable {
    /// Unique column names in first-encounter order.
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl ProjectTable {
    /// Flatten raw rows (two header rows followed by data).
    ///
    /// Duplicate flattened names collapse into one key; the right-most
    /// column's value is kept. Blank rows are dropped.
    pub fn from_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> Self {
        let schema = Schema::from_rows(rows);
        let records: Vec<Record> = data_rows(rows).map(|(_, row)| schema.record(row)).collect();
        let columns = schema.index_map().keys().map(|k| (*k).to_string()).collect();
        Self { columns, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First column whose name contains any of `needles` (case-insensitive).
    pub fn find_column(&self, needles: &[&str]) -> Option<&str> {
        self.columns
            .iter()
            .find(|name| {
                let lower = name.to_lowercase();
                needles.iter().any(|n| lower.contains(n))
            })
            .map(String::as_str)
    }

    /// Values of a column across all records.
    pub fn column_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.records
            .iter()
            .map(move |record| record.get(name).map(String::as_str).unwrap_or(""))
    }

    /// Project only the given columns, in the requested order.
    ///
    /// Unknown names are dropped.
    pub fn select(&self, wanted: &[String]) -> ProjectTable {
        let columns: Vec<String> = wanted
            .iter()
            .filter(|name| self.columns.contains(name))
            .cloned()
            .collect();
        let records = self
            .records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| (c.clone(), record.get(c).cloned().unwrap_or_default()))
                    .collect()
            })
            .collect();
        ProjectTable { columns, records }
    }
}
