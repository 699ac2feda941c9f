//! Holdings header detection.

use super::normalize::comparison_form;

/// Substrings that identify the holdings header row.
pub const DEFAULT_HEADER_MARKERS: [&str; 3] = ["CUSIP", "TICKER", "DESCRIPTION"];

/// Index of the first line whose comparison form contains any of `markers`.
///
/// Matching is substring containment, not field equality, so a header such
/// as `SECURITY_DESCRIPTION` also qualifies.
pub fn locate_header<M: AsRef<str>>(block_lines: &[String], markers: &[M]) -> Option<usize> {
    let markers: Vec<String> = markers
        .iter()
        .map(|m| m.as_ref().trim().to_uppercase())
        .filter(|m| !m.is_empty())
        .collect();

    block_lines.iter().position(|line| {
        let form = comparison_form(line);
        markers.iter().any(|m| form.contains(m.as_str()))
    })
}
