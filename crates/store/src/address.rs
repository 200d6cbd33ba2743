//! A1 notation helpers for addressing worksheet ranges.

/// Convert a zero-based column index to its letter form (`0` → `A`, `26` → `AA`).
pub fn column_letters(index: usize) -> String {
    let mut n = index;
    let mut out = Vec::new();
    loop {
        out.push(b'A' + (n % 26) as u8);
        n /= 26;
        if n == 0 {
            break;
        }
        n -= 1;
    }
    out.iter().rev().map(|b| char::from(*b)).collect()
}

/// Quote a sheet title for use in a range, doubling embedded quotes.
pub fn quote_sheet(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Range covering the whole sheet.
pub fn sheet_range(title: &str) -> String {
    quote_sheet(title)
}

/// Range covering one full column.
pub fn column_range(title: &str, col: usize) -> String {
    let letters = column_letters(col);
    format!("{}!{letters}:{letters}", quote_sheet(title))
}

/// Address of a single cell from zero-based coordinates.
pub fn cell_address(title: &str, row: usize, col: usize) -> String {
    format!("{}!{}{}", quote_sheet(title), column_letters(col), row + 1)
}
