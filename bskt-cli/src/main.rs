//! BSKT CLI — parse basket files, load them into SQLite, export them.
//!
//! Commands:
//! - `parse` — parse one file and print a summary or the full JSON
//! - `load` — run the pipeline over one or more files and write SQLite tables
//! - `export` — write records as JSON plus metadata/holdings CSV files
//! - `config init` — write the default pipeline configuration as TOML

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bskt_core::ParsedFile;
use bskt_pipeline::{
    holdings_to_csv, metadata_to_csv, records_to_json, run_file, IfExists, PipelineConfig,
    ProcessedFile, SqliteLoader,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bskt", about = "BSKT — multi-fund basket file parser and loader")]
struct Cli {
    /// Log filter (e.g. `info`, `bskt_core=debug`). `RUST_LOG` wins when set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Also write logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Summary,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse one basket file and print what was found.
    Parse {
        file: PathBuf,

        /// Pipeline config (TOML). Defaults to the built-in NAV layout.
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Summary)]
        format: OutputFormat,

        /// Parse blocks in parallel.
        #[arg(long, default_value_t = false)]
        parallel: bool,
    },
    /// Run the pipeline over basket files and load the results into SQLite.
    Load {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// SQLite database file (created if missing).
        #[arg(long)]
        db: PathBuf,

        /// Tables are named `<prefix>_metadata` and `<prefix>_holdings`.
        #[arg(long, default_value = "bskt")]
        table_prefix: String,

        /// Append to existing tables instead of replacing them.
        #[arg(long, default_value_t = false)]
        append: bool,

        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write records.json, metadata.csv and one holdings CSV per record.
    Export {
        file: PathBuf,

        #[arg(long, default_value = "export")]
        out_dir: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Configuration helpers.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default configuration.
    Init {
        /// Output path. Prints to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Parse {
            file,
            config,
            format,
            parallel,
        } => run_parse(&file, config.as_deref(), format, parallel),
        Commands::Load {
            files,
            db,
            table_prefix,
            append,
            config,
        } => run_load(&files, &db, &table_prefix, append, config.as_deref()),
        Commands::Export {
            file,
            out_dir,
            config,
        } => run_export(&file, &out_dir, config.as_deref()),
        Commands::Config { action } => match action {
            ConfigAction::Init { output, force } => run_config_init(output.as_deref(), force),
        },
    }
}

fn init_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log filter '{level}'"))?;

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn process(file: &Path, config: &PipelineConfig) -> Result<ProcessedFile> {
    run_file(file, config).with_context(|| format!("failed to read {}", file.display()))
}

fn run_parse(
    file: &Path,
    config_path: Option<&Path>,
    format: OutputFormat,
    parallel: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    config.parser.parallel |= parallel;

    let processed = process(file, &config)?;
    match format {
        OutputFormat::Json => println!("{}", records_to_json(&processed.parsed)?),
        OutputFormat::Summary => print_summary(file, &processed),
    }
    Ok(())
}

fn run_load(
    files: &[PathBuf],
    db: &Path,
    prefix: &str,
    append: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let mut loader = SqliteLoader::open(db)
        .with_context(|| format!("failed to open database {}", db.display()))?;

    let total_records = load_files(&mut loader, files, prefix, append, &config)
        .with_context(|| format!("failed to load into {}", db.display()))?;

    info!(db = %db.display(), records = total_records, "load complete");
    println!("Loaded {total_records} record(s) into {}", db.display());
    Ok(())
}

/// Load every file in order. Without `append`, the first file that has
/// records replaces the tables and the rest accumulate onto it.
fn load_files(
    loader: &mut SqliteLoader,
    files: &[PathBuf],
    prefix: &str,
    append: bool,
    config: &PipelineConfig,
) -> Result<usize> {
    let mut replaced = append;
    let mut total_records = 0;
    for file in files {
        let processed = process(file, config)?;
        if processed.parsed.is_empty() {
            warn!(path = %file.display(), "no records found, nothing to load");
            continue;
        }
        let mode = if replaced {
            IfExists::Append
        } else {
            IfExists::Replace
        };
        let summary = loader
            .load_records(&processed.parsed, prefix, mode)
            .with_context(|| format!("failed to load {}", file.display()))?;
        replaced = true;
        total_records += summary.metadata_rows;
        println!(
            "{}: {} record(s), {} holding row(s), {} skipped block(s), {} invalid",
            file.display(),
            summary.metadata_rows,
            summary.holdings_rows,
            processed.parsed.skipped_blocks(),
            processed.invalid_records(),
        );
    }
    Ok(total_records)
}

fn run_export(file: &Path, out_dir: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let processed = process(file, &config)?;
    let parsed = &processed.parsed;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    write_file(&out_dir.join("records.json"), &records_to_json(parsed)?)?;
    write_file(&out_dir.join("metadata.csv"), &metadata_to_csv(&parsed.records)?)?;
    for record in &parsed.records {
        let name = format!("holdings_{}.csv", record.block_index);
        write_file(&out_dir.join(name), &holdings_to_csv(&record.holdings)?)?;
    }

    println!(
        "Exported {} record(s) to {}",
        parsed.records.len(),
        out_dir.display()
    );
    Ok(())
}

fn run_config_init(output: Option<&Path>, force: bool) -> Result<()> {
    let text = PipelineConfig::default().to_toml()?;
    match output {
        Some(path) => {
            if path.exists() && !force {
                bail!("{} already exists (pass --force to overwrite)", path.display());
            }
            write_file(path, &text)?;
            println!("Wrote default config to {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

fn print_summary(file: &Path, processed: &ProcessedFile) {
    let parsed: &ParsedFile = &processed.parsed;
    println!();
    println!("=== {} ===", file.display());
    println!("Blocks:       {}", parsed.block_count);
    println!("Records:      {}", parsed.records.len());
    println!("Skipped:      {}", parsed.skipped_blocks());
    println!("Invalid:      {}", processed.invalid_records());
    println!("Source hash:  {}", parsed.source_hash);
    println!();

    if !parsed.records.is_empty() {
        println!(
            "{:<6} {:<6} {:<10} {:<30} {:>8} {:>8}",
            "Block", "Line", "Ticker", "Name", "Columns", "Rows"
        );
        println!("{}", "-".repeat(73));
        for record in &parsed.records {
            println!(
                "{:<6} {:<6} {:<10} {:<30} {:>8} {:>8}",
                record.block_index,
                record.start_line,
                record.ticker().unwrap_or("-"),
                record.get("FULL_NAME").as_str().unwrap_or("-"),
                record.holdings.width(),
                record.holdings.height(),
            );
        }
        println!();
    }

    for diagnostic in &parsed.diagnostics {
        println!("NOTE: {diagnostic}");
    }
    for report in processed.reports.iter().filter(|r| !r.is_valid()) {
        for error in report.metadata.errors.iter().chain(&report.holdings.errors) {
            println!(
                "INVALID: block {} (line {}): {error}",
                report.block_index, report.start_line
            );
        }
    }
}
