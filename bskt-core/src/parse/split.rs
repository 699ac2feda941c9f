//! Block splitting at marker lines.

use super::normalize::comparison_form;

/// Token that opens a fund block.
pub const DEFAULT_START_MARKER: &str = "TRADE_DATE";

/// A contiguous span of input lines belonging to one fund record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<'a> {
    /// Position of this block among all blocks of the input (0-based).
    pub index: usize,
    /// Offset of the marker line in the input (0-based).
    pub start: usize,
    pub lines: &'a [String],
}

impl<'a> Block<'a> {
    /// 1-based line number of the marker line, for operator-facing messages.
    pub fn start_line(&self) -> usize {
        self.start + 1
    }

    /// Offset one past the last line of the block.
    pub fn end(&self) -> usize {
        self.start + self.lines.len()
    }
}

/// Partition `lines` into blocks, each starting at a line whose comparison
/// form begins with `marker`.
///
/// Lines before the first marker belong to no block. No markers yields an
/// empty vector.
pub fn split_blocks<'a>(lines: &'a [String], marker: &str) -> Vec<Block<'a>> {
    let marker = marker.trim().to_uppercase();
    let starts: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| comparison_form(line).starts_with(&marker))
        .map(|(idx, _)| idx)
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(index, &start)| {
            let end = starts.get(index + 1).copied().unwrap_or(lines.len());
            Block {
                index,
                start,
                lines: &lines[start..end],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_markers_yields_no_blocks() {
        let lines = owned(&["CUSIP,TICKER", "1,A"]);
        assert!(split_blocks(&lines, DEFAULT_START_MARKER).is_empty());
    }

    #[test]
    fn empty_input_yields_no_blocks() {
        let lines: Vec<String> = Vec::new();
        assert!(split_blocks(&lines, DEFAULT_START_MARKER).is_empty());
    }

    #[test]
    fn preamble_before_first_marker_is_discarded() {
        let lines = owned(&["junk", "more junk", "TRADE_DATE,1", "CUSIP", "x"]);
        let blocks = split_blocks(&lines, DEFAULT_START_MARKER);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start, 2);
        assert_eq!(blocks[0].start_line(), 3);
        assert_eq!(blocks[0].lines.len(), 3);
    }

    #[test]
    fn blocks_are_contiguous() {
        let lines = owned(&[
            "TRADE_DATE,1",
            "a",
            "TRADE_DATE,2",
            "b",
            "c",
            "TRADE_DATE,3",
        ]);
        let blocks = split_blocks(&lines, DEFAULT_START_MARKER);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].end(), blocks[1].start);
        assert_eq!(blocks[1].end(), blocks[2].start);
        assert_eq!(blocks[2].end(), lines.len());
        // Trailing marker forms a one-line block.
        assert_eq!(blocks[2].lines, &["TRADE_DATE,3".to_string()]);
    }

    #[test]
    fn marker_match_ignores_case_whitespace_and_apostrophe() {
        let lines = owned(&["  'trade_date,2026-01-01", "x"]);
        let blocks = split_blocks(&lines, DEFAULT_START_MARKER);
        assert_eq!(blocks.len(), 1);
        // Stored line is untouched.
        assert_eq!(blocks[0].lines[0], "  'trade_date,2026-01-01");
    }

    #[test]
    fn marker_must_be_a_prefix() {
        let lines = owned(&["X,TRADE_DATE", "TRADE_DATE,1"]);
        let blocks = split_blocks(&lines, DEFAULT_START_MARKER);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start, 1);
    }
}
