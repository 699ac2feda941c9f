//! Line normalization.
//!
//! Stored lines keep their original case and quoting. Only the comparison
//! form is trimmed, stripped of a spreadsheet text-escape apostrophe and
//! upper-cased, so marker and header matching is insensitive to those
//! artifacts while literal values survive untouched.

/// Remove trailing `\n` / `\r` characters.
pub fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// Remove a single leading apostrophe, if present.
pub fn strip_quote_prefix(value: &str) -> &str {
    value.strip_prefix('\'').unwrap_or(value)
}

/// Comparison form of a line: trimmed, one leading apostrophe removed, upper-cased.
pub fn comparison_form(line: &str) -> String {
    strip_quote_prefix(line.trim()).to_uppercase()
}
