//! Property tests for parser invariants.
//!
//! Uses proptest to verify:
//! 1. Splitter: one block per marker, contiguous, covering the input from the first marker
//! 2. Header split: metadata is block[..h], holdings start at block[h]
//! 3. Normalization is idempotent
//! 4. Coercion is total: every key maps to a value or null
//! 5. Parallel parsing matches sequential parsing

use bskt_core::config::{NullSentinels, TypeRegistry};
use bskt_core::parse::{clean, coerce, header, metadata, split};
use bskt_core::{parse_lines, HoldingsTable, ParserConfig, ValueType};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Lines that never match the start marker.
fn arb_plain_line() -> impl Strategy<Value = String> {
    "[a-z0-9 ,'\"]{0,24}".prop_filter("must not look like a marker", |l| {
        !l.trim()
            .trim_start_matches('\'')
            .to_uppercase()
            .starts_with("TRADE_DATE")
    })
}

fn arb_marker_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("TRADE_DATE,2026-02-18".to_string()),
        Just("'trade_date,2026-02-19,X".to_string()),
        Just("  TRADE_DATE".to_string()),
    ]
}

/// A mix of marker and plain lines.
fn arb_lines() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![1 => arb_marker_line(), 3 => arb_plain_line()],
        0..40,
    )
}

fn arb_cell() -> impl Strategy<Value = String> {
    prop_oneof![
        "[ ']{0,3}[a-zA-Z ]{0,8}[ ]{0,2}",
        "-?[0-9]{1,6}",
        "-?[0-9]{1,4}\\.[0-9]{1,3}",
        Just(String::new()),
    ]
}

fn arb_table() -> impl Strategy<Value = HoldingsTable> {
    (1usize..5).prop_flat_map(|width| {
        let columns = prop::collection::vec("[A-Z]{1,6}", width);
        let rows = prop::collection::vec(prop::collection::vec(arb_cell(), 0..=width + 1), 0..8);
        (columns, rows).prop_map(|(columns, rows)| HoldingsTable::from_parts(columns, rows))
    })
}

fn arb_value_type() -> impl Strategy<Value = ValueType> {
    prop_oneof![
        Just(ValueType::String),
        Just(ValueType::Float),
        Just(ValueType::Integer),
        Just(ValueType::Timestamp),
    ]
}

// ── 1. Splitter ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn one_block_per_marker(lines in arb_lines()) {
        let markers = lines
            .iter()
            .filter(|l| l.trim().trim_start_matches('\'').to_uppercase().starts_with("TRADE_DATE"))
            .count();
        let blocks = split::split_blocks(&lines, "TRADE_DATE");
        prop_assert_eq!(blocks.len(), markers);
    }

    #[test]
    fn blocks_are_contiguous_and_cover_the_tail(lines in arb_lines()) {
        let blocks = split::split_blocks(&lines, "TRADE_DATE");
        if let Some(first) = blocks.first() {
            let mut cursor = first.start;
            for (i, block) in blocks.iter().enumerate() {
                prop_assert_eq!(block.index, i);
                prop_assert_eq!(block.start, cursor);
                prop_assert!(!block.lines.is_empty());
                prop_assert_eq!(block.lines[0].as_str(), lines[block.start].as_str());
                cursor = block.end();
            }
            prop_assert_eq!(cursor, lines.len());
        }
    }
}

// ── 2. Header Split ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn header_index_splits_metadata_from_holdings(
        metadata_lines in prop::collection::vec("[a-b0-9,]{0,16}", 0..6),
        holdings_rows in prop::collection::vec("[a-b0-9,]{0,16}", 0..6),
    ) {
        let mut block = metadata_lines.clone();
        block.push("CUSIP,TICKER".to_string());
        block.extend(holdings_rows);

        let h = header::locate_header(&block, &header::DEFAULT_HEADER_MARKERS);
        prop_assert_eq!(h, Some(metadata_lines.len()));

        let (meta, holdings) = block.split_at(metadata_lines.len());
        prop_assert_eq!(meta, metadata_lines.as_slice());
        prop_assert_eq!(holdings[0].as_str(), "CUSIP,TICKER");
    }

    #[test]
    fn block_without_header_yields_no_record(
        body in prop::collection::vec("[a-b0-9,]{0,16}", 0..6),
    ) {
        let mut lines = vec!["TRADE_DATE,2026-02-18".to_string()];
        lines.extend(body);
        let parsed = parse_lines(&lines, &ParserConfig::default());
        prop_assert_eq!(parsed.block_count, 1);
        prop_assert!(parsed.records.is_empty());
        prop_assert_eq!(parsed.skipped_blocks(), 1);
    }
}

// ── 3. Normalization ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn normalize_is_idempotent(table in arb_table()) {
        let once = clean::normalize_holdings(table);
        let twice = clean::normalize_holdings(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn normalize_preserves_shape(table in arb_table()) {
        let (width, height) = (table.width(), table.height());
        let cleaned = clean::normalize_holdings(table);
        prop_assert_eq!(cleaned.width(), width);
        prop_assert_eq!(cleaned.height(), height);
        prop_assert!(cleaned.rows().iter().all(|r| r.len() == width));
    }
}

// ── 4. Coercion Totality ─────────────────────────────────────────────

proptest! {
    #[test]
    fn coercion_covers_every_key(
        entries in prop::collection::btree_map("[A-Z_]{1,10}", ".{0,20}", 0..12),
        types in prop::collection::vec(("[A-Z_]{1,10}", arb_value_type()), 0..12),
    ) {
        let mut registry = TypeRegistry::new();
        for (key, ty) in &types {
            registry.insert(key, *ty);
        }
        let raw: metadata::RawMetadata = entries;
        let coerced = coerce::coerce_metadata(&raw, &registry, &NullSentinels::default());

        prop_assert_eq!(coerced.values.len(), raw.len());
        for key in raw.keys() {
            prop_assert!(coerced.values.contains_key(key));
        }
        for failure in &coerced.failures {
            prop_assert!(coerced.values[&failure.key].is_null());
        }
    }

    #[test]
    fn coerced_values_match_declared_type(raw in ".{0,20}", ty in arb_value_type()) {
        if let Some(value) = coerce::coerce_value(&raw, ty, &NullSentinels::default()) {
            prop_assert!(value.is_null() || value.value_type() == Some(ty));
        }
    }
}

// ── 5. Parallel Parsing ──────────────────────────────────────────────

proptest! {
    #[test]
    fn parallel_parse_matches_sequential(lines in arb_lines()) {
        let sequential = parse_lines(&lines, &ParserConfig::default());
        let parallel = parse_lines(
            &lines,
            &ParserConfig {
                parallel: true,
                ..ParserConfig::default()
            },
        );
        prop_assert_eq!(sequential, parallel);
    }
}
