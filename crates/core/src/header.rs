//! Flattening of two-row grouped headers.
//!
//! Ledger worksheets carry a group row (e.g. `"EXPORT"`, spanning several
//! columns) above a sub-label row (e.g. `"Previous"`, `"Current"`). The group
//! label is sticky: it applies to every following column until the next
//! non-blank group cell.

use indexmap::IndexMap;

/// Number of header rows at the top of every grouped table.
pub const HEADER_ROWS: usize = 2;

/// Sub-label that is never prefixed with a group.
const UNGROUPED_LABEL: &str = "MONTH";

/// Flatten a group row and a sub-label row into one name per column.
///
/// The result has one entry per sub-label column. A group row shorter than
/// the sub-label row is treated as blank in the missing positions. Names are
/// not de-duplicated.
pub fn reconcile<S: AsRef<str>>(group_row: &[S], sublabel_row: &[S]) -> Vec<String> {
    let mut current_group = String::new();
    let mut names = Vec::with_capacity(sublabel_row.len());

    for (i, raw_sublabel) in sublabel_row.iter().enumerate() {
        if let Some(group) = group_row.get(i).map(|g| g.as_ref().trim()) {
            if !group.is_empty() {
                current_group = group.to_string();
            }
        }

        let sublabel = raw_sublabel.as_ref().trim();
        let name = if !current_group.is_empty() && !sublabel.is_empty() && sublabel != UNGROUPED_LABEL {
            format!("{current_group} - {sublabel}")
        } else if !sublabel.is_empty() {
            sublabel.to_string()
        } else {
            placeholder(i)
        };
        names.push(name);
    }

    names
}

/// Positional placeholder for a column with no usable label.
pub fn placeholder(index: usize) -> String {
    format!("Col_{index}")
}

/// Check whether every cell of a row is blank after trimming.
pub fn is_blank_row<S: AsRef<str>>(row: &[S]) -> bool {
    row.iter().all(|cell| cell.as_ref().trim().is_empty())
}

/// One flattened column and the position it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub index: usize,
}

/// Ordered column schema of one grouped table, built once per read.
///
/// Positions are authoritative. Names may repeat; name-keyed views collapse
/// repeats as documented on each accessor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Build the schema of a raw table from its first two rows.
    ///
    /// Tables with fewer than two rows have an empty schema. A table whose
    /// group row is wider than its sub-label row only gets columns for the
    /// sub-label positions.
    pub fn from_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> Self {
        match rows {
            [group, sublabel, ..] => Self::from_headers(group, sublabel),
            _ => Self::default(),
        }
    }

    /// Build a schema from an explicit group row and sub-label row.
    pub fn from_headers<S: AsRef<str>>(group_row: &[S], sublabel_row: &[S]) -> Self {
        let columns = reconcile(group_row, sublabel_row)
            .into_iter()
            .enumerate()
            .map(|(index, name)| Column { name, index })
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Flattened names in column order, repeats included.
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Name to column index map.
    ///
    /// When a name repeats, the right-most column wins.
    pub fn index_map(&self) -> IndexMap<&str, usize> {
        let mut map = IndexMap::with_capacity(self.columns.len());
        for column in &self.columns {
            map.insert(column.name.as_str(), column.index);
        }
        map
    }

    /// Convert one data row into a name-keyed record.
    ///
    /// Accepted lossy behavior: when a name repeats, the later column's value
    /// overwrites the earlier one under the key's first position. Missing
    /// trailing cells read as empty strings.
    pub fn record<S: AsRef<str>>(&self, row: &[S]) -> IndexMap<String, String> {
        let mut record = IndexMap::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = row
                .get(column.index)
                .map(|cell| cell.as_ref().to_string())
                .unwrap_or_default();
            record.insert(column.name.clone(), value);
        }
        record
    }
}

/// Iterate the data rows of a grouped table with their absolute row index.
///
/// Header rows and entirely blank rows are skipped. Tables with fewer than
/// three rows yield nothing.
pub fn data_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> impl Iterator<Item = (usize, &[S])> {
    rows.iter()
        .enumerate()
        .skip(HEADER_ROWS)
        .filter(|(_, row)| !is_blank_row(row))
        .map(|(i, row)| (i, row.as_slice()))
}
