//! Column and table name normalization.

use std::collections::HashSet;
use std::path::Path;

/// Table name used when a display name normalizes to nothing.
pub const FALLBACK_TABLE_NAME: &str = "untitled";

fn substitute(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Normalize one column name.
///
/// Every character that is not a letter, digit or underscore becomes `_`, a
/// leading digit gets a `_` prefix, and the result is lowercased. Applying it
/// twice gives the same result as applying it once.
pub fn normalize_column_name(name: &str) -> String {
    let mut out = substitute(name);
    if out.starts_with(|c: char| c.is_numeric()) {
        out.insert(0, '_');
    }
    // Lowercasing can expand into combining marks; substitute those too.
    substitute(&out.to_lowercase())
}

/// Normalize a header row.
///
/// Empty results become `column_<n>` (1-based) and repeats get a `_<n>`
/// suffix so every column in the table has a distinct name.
pub fn normalize_columns<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(names.len());
    let mut out = Vec::with_capacity(names.len());
    for (i, raw) in names.iter().enumerate() {
        let mut name = normalize_column_name(raw.as_ref());
        if name.is_empty() {
            name = format!("column_{}", i + 1);
        }
        if seen.contains(&name) {
            let mut n = 2;
            while seen.contains(&format!("{name}_{n}")) {
                n += 1;
            }
            name = format!("{name}_{n}");
        }
        seen.insert(name.clone());
        out.push(name);
    }
    out
}

/// Catalog view name for a display name.
///
/// Uses the file stem, applies the column rule and falls back to
/// [`FALLBACK_TABLE_NAME`] when nothing is left.
pub fn table_name_for(display_name: &str) -> String {
    let stem = Path::new(display_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = normalize_column_name(&stem);
    if name.is_empty() { FALLBACK_TABLE_NAME.to_string() } else { name }
}
