//! Project name to worksheet title resolution.

/// Normalize a name for matching: trimmed and lowercased.
fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Pick the worksheet title that belongs to `project`.
///
/// An exact (normalized) match always wins. Otherwise the first title, in
/// the given enumeration order, that contains the project name or is
/// contained by it is returned. Ties are broken by order only, never by
/// match length, so resolution stays stable for a given store.
pub fn resolve<'a, S: AsRef<str>>(project: &str, titles: &'a [S]) -> Option<&'a str> {
    let target = normalize(project);
    if target.is_empty() {
        return None;
    }

    let normalized: Vec<String> = titles.iter().map(|t| normalize(t.as_ref())).collect();

    if let Some(pos) = normalized.iter().position(|t| *t == target) {
        return Some(titles[pos].as_ref());
    }

    normalized
        .iter()
        .position(|t| !t.is_empty() && (target.contains(t.as_str()) || t.contains(target.as_str())))
        .map(|pos| titles[pos].as_ref())
}
