//! End-to-end tests: basket file on disk → parsed records → SQLite.

use std::path::{Path, PathBuf};

use bskt_core::{DiagnosticKind, MetadataValue, ParserConfig};
use bskt_pipeline::{
    parse_file, read_input, run_file, BasketInput, FillMethod, FillStrategy, IfExists,
    PipelineConfig, ReadError, SqliteLoader,
};

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/INAV_BSKT_20260218.csv")
}

fn fixture_text() -> String {
    std::fs::read_to_string(fixture()).unwrap()
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

// ── Parsing From Disk ────────────────────────────────────────────────

#[test]
fn fixture_parses_with_diagnostics() {
    let parsed = parse_file(&fixture(), &ParserConfig::default()).unwrap();

    assert_eq!(parsed.block_count, 3);
    assert_eq!(parsed.records.len(), 2);
    assert_eq!(parsed.skipped_blocks(), 1);

    let fund = &parsed.records[0];
    assert_eq!(fund.ticker(), Some("TST"));
    assert_eq!(fund.get("CREATION_UNIT_SIZE"), &MetadataValue::Float(50000.0));
    assert_eq!(fund.get("NAV"), &MetadataValue::Float(25.1));
    assert_eq!(fund.get("EXPENSE_RATIO"), &MetadataValue::Float(0.45));
    assert_eq!(
        fund.get("ESTIMATED_CASH_COMPONENT"),
        &MetadataValue::Float(1234.56)
    );
    assert!(fund.get("THRESHOLD").is_null());

    let holdings = &fund.holdings;
    assert_eq!(holdings.height(), 3);
    assert_eq!(
        holdings.column("CUSIP").unwrap(),
        vec!["037833100", "594918104", "02079K305"]
    );
    assert_eq!(
        holdings.column("DESCRIPTION").unwrap(),
        vec!["APPLE INC", "MICROSOFT CORP", "ALPHABET INC, CLASS A"]
    );
    assert_eq!(holdings.column("SHARES").unwrap(), vec!["1200", "800", ""]);

    let kinds: Vec<&DiagnosticKind> = parsed.diagnostics.iter().map(|d| &d.kind).collect();
    assert!(matches!(
        kinds[0],
        DiagnosticKind::CoercionFallback { key, .. } if key == "NAV"
    ));
    assert_eq!(kinds[1], &DiagnosticKind::MissingHeader);
    assert_eq!(parsed.diagnostics[1].start_line, 12);
}

#[test]
fn tab_and_json_inputs_match_csv() {
    let dir = tempfile::tempdir().unwrap();
    let csv = parse_file(&fixture(), &ParserConfig::default()).unwrap();

    // Tab-delimited rows: commas stay inside their cell.
    let tab_text = "TRADE_DATE\t2026-02-18\tLCODE123\t\tMy Fund\tTST\t\tUSD\n\
                    CUSIP\tTICKER\tDESCRIPTION\n\
                    037833100\taapl\tapple inc, class a\n";
    let tab = parse_file(&write(dir.path(), "basket.txt", tab_text), &ParserConfig::default())
        .unwrap();
    assert_eq!(tab.records.len(), 1);
    assert_eq!(tab.records[0].get("FULL_NAME").as_str(), Some("MY FUND"));
    assert_eq!(
        tab.records[0].holdings.cell(0, "DESCRIPTION"),
        Some("APPLE INC, CLASS A")
    );

    // JSON lines holding the raw CSV lines.
    let json_text: String = fixture_text()
        .lines()
        .map(|l| format!("{}\n", serde_json::to_string(l).unwrap()))
        .collect();
    let json = parse_file(&write(dir.path(), "basket.json", &json_text), &ParserConfig::default())
        .unwrap();
    assert_eq!(json.records, csv.records);
}

#[test]
fn ndm01_reads_as_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "BASKET.NDM01", &fixture_text());
    let input = read_input(&path).unwrap();
    assert!(matches!(input, BasketInput::Lines(ref lines) if lines.len() == 13));
}

#[test]
fn spreadsheet_reads_first_sheet_as_rows() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/INAV_BSKT_20260218.xlsx");
    let input = read_input(&path).unwrap();
    let BasketInput::Rows(rows) = &input else {
        panic!("expected rows, got {input:?}");
    };
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0][3], "");
    assert_eq!(rows[0].last().map(String::as_str), Some("USD"));
    assert_eq!(rows[1][1], "25000");

    let parsed = parse_file(&path, &ParserConfig::default()).unwrap();
    assert_eq!(parsed.records.len(), 1);
    let fund = &parsed.records[0];
    assert_eq!(fund.ticker(), Some("SHT"));
    assert_eq!(fund.get("FULL_NAME").as_str(), Some("SHEET FUND"));
    assert_eq!(fund.get("CREATION_UNIT_SIZE"), &MetadataValue::Float(25000.0));
    assert_eq!(fund.get("NAV"), &MetadataValue::Float(12.5));
    assert_eq!(
        fund.holdings.column("CUSIP").unwrap(),
        vec!["037833100", "594918104"]
    );
    assert_eq!(fund.holdings.column("SHARES").unwrap(), vec!["1200", ""]);
    assert_eq!(fund.holdings.cell(1, "WEIGHT"), Some("0.4"));
}

#[test]
fn unsupported_inputs_are_fatal() {
    let dir = tempfile::tempdir().unwrap();

    let err = parse_file(&write(dir.path(), "basket.parquet", ""), &ParserConfig::default())
        .unwrap_err();
    assert!(matches!(err, ReadError::UnsupportedFileType { .. }));

    let err = parse_file(&write(dir.path(), "basket.xlsx", ""), &ParserConfig::default())
        .unwrap_err();
    assert!(matches!(err, ReadError::Spreadsheet { .. }));

    let err = parse_file(&dir.path().join("absent.csv"), &ParserConfig::default()).unwrap_err();
    assert!(matches!(err, ReadError::Io { .. }));
}

// ── Full Pipeline ────────────────────────────────────────────────────

#[test]
fn fixture_loads_into_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("bskt.db");

    let config = PipelineConfig::from_toml(
        r#"
[validate.holdings.columns.SHARES]
required = true
type = "numeric"

[fill.columns]
SHARES = { method = "median" }

[[transform.computed]]
name = "SHARES_X_WEIGHT"
expr = { op = "product", left = "SHARES", right = "WEIGHT" }
"#,
    )
    .unwrap();

    let processed = run_file(&fixture(), &config).unwrap();
    assert_eq!(processed.invalid_records(), 0);

    let first = &processed.parsed.records[0].holdings;
    assert_eq!(first.cell(2, "SHARES"), Some("1000"));
    let product: f64 = first.cell(0, "SHARES_X_WEIGHT").unwrap().parse().unwrap();
    assert!((product - 420.0).abs() < 1e-9);
    // The second fund has no WEIGHT column, so the product is absent there.
    assert!(processed.parsed.records[1]
        .holdings
        .column("SHARES_X_WEIGHT")
        .is_none());

    let mut loader = SqliteLoader::open(&db).unwrap();
    let summary = loader
        .load_records(&processed.parsed, "bskt", IfExists::Replace)
        .unwrap();
    assert_eq!(summary.metadata_rows, 2);
    assert_eq!(summary.holdings_rows, 4);
    drop(loader);

    // Reopen to check the data reached disk.
    let loader = SqliteLoader::open(&db).unwrap();
    assert_eq!(loader.query_count("bskt_holdings").unwrap(), 4);
    let types = loader.column_types("bskt_holdings").unwrap();
    let type_of = |name: &str| {
        types
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, ty)| ty.as_str())
    };
    assert_eq!(type_of("FUND_INDEX"), Some("INTEGER"));
    assert_eq!(type_of("CUSIP"), Some("TEXT"));
    assert_eq!(type_of("SHARES"), Some("INTEGER"));
    assert_eq!(type_of("WEIGHT"), Some("REAL"));

    let nav: Option<f64> = loader
        .connection()
        .query_row(
            "SELECT NAV FROM bskt_metadata WHERE TICKER = 'XYZ'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(nav, None);
}

#[test]
fn append_mode_accumulates_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut loader = SqliteLoader::open(&dir.path().join("bskt.db")).unwrap();
    let parsed = parse_file(&fixture(), &ParserConfig::default()).unwrap();

    loader.load_records(&parsed, "bskt", IfExists::Replace).unwrap();
    loader.load_records(&parsed, "bskt", IfExists::Append).unwrap();
    assert_eq!(loader.query_count("bskt_metadata").unwrap(), 4);
    assert_eq!(loader.query_count("bskt_holdings").unwrap(), 8);
}

#[test]
fn appended_files_keep_holdings_linked_to_their_fund() {
    let dir = tempfile::tempdir().unwrap();
    let fund_a = write(
        dir.path(),
        "a.csv",
        "TRADE_DATE,2026-02-18,LCODE1,,Fund A,AAA,,USD\nCUSIP,TICKER\n111111111,x\n",
    );
    let fund_b = write(
        dir.path(),
        "b.csv",
        "TRADE_DATE,2026-02-19,LCODE2,,Fund B,BBB,,USD\nCUSIP,TICKER\n222222222,y\n",
    );

    let mut loader = SqliteLoader::open(&dir.path().join("bskt.db")).unwrap();
    let config = ParserConfig::default();
    loader
        .load_records(&parse_file(&fund_a, &config).unwrap(), "bskt", IfExists::Replace)
        .unwrap();
    loader
        .load_records(&parse_file(&fund_b, &config).unwrap(), "bskt", IfExists::Append)
        .unwrap();

    let conn = loader.connection();
    let tickers_for = |cusip: i64| -> Vec<String> {
        let mut stmt = conn
            .prepare(
                "SELECT m.TICKER FROM bskt_holdings h JOIN bskt_metadata m \
                 ON h.FUND_INDEX = m.FUND_INDEX WHERE h.CUSIP = ?1",
            )
            .unwrap();
        stmt.query_map([cusip], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    };
    assert_eq!(tickers_for(111111111), vec!["AAA"]);
    assert_eq!(tickers_for(222222222), vec!["BBB"]);
}

#[test]
fn fill_strategy_ignores_absent_columns_end_to_end() {
    let mut config = PipelineConfig::default();
    config.fill = FillStrategy::new().with("NOT_A_COLUMN", FillMethod::Mean);
    let processed = run_file(&fixture(), &config).unwrap();
    let parsed = parse_file(&fixture(), &ParserConfig::default()).unwrap();
    assert_eq!(processed.parsed, parsed);
}
