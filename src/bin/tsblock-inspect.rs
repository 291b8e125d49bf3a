//! Inspection tool for tsblock block directories.
//!
//! Loads configuration from (in precedence order): defaults, config file, environment variables
//! (`TSBLOCK_*`), and CLI flags. Opens the block, runs one query and prints the result.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use config::{Config, Environment, File};
use tsblock::telemetry::{BlockEvent, BlockEventListener};
use tsblock::{Block, BlockError, ReaderFileConfig, ReaderOptions, Series, Timestamp};

// ---------- CLI ----------

/// Inspect the index and series data of a tsblock block directory.
#[derive(Parser, Debug)]
#[command(name = "tsblock-inspect", version, about)]
pub struct Cli {
    /// Path to config file (TOML). If omitted, `tsblock.toml` is loaded when present.
    #[arg(long, env = "TSBLOCK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Block directory containing `index` and `series` files.
    #[arg(long, env = "TSBLOCK_BLOCK_DIR")]
    pub block_dir: Option<PathBuf>,

    /// Do not load any config file; use defaults + env + CLI only.
    #[arg(long, default_value_t = false)]
    pub no_config: bool,

    /// Load and validate config (file + env + CLI), print the effective settings, then exit.
    #[arg(long, default_value_t = false)]
    pub validate_config: bool,

    /// Verify section checksums while reading the index.
    #[arg(long, default_value_t = false)]
    pub verify_checksums: bool,

    /// Print reader metrics in Prometheus text format after the command.
    #[cfg(feature = "prometheus")]
    #[arg(long, default_value_t = false)]
    pub print_metrics: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the block stats record.
    Stats,
    /// List the label name combinations that have a label index.
    LabelIndices,
    /// Print the value tuples of the label index over NAMES.
    LabelValues {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Print the series references for NAME=VALUE.
    Postings { name: String, value: String },
    /// Print the series for NAME=VALUE with chunks overlapping [MINT, MAXT].
    Series {
        #[arg(long)]
        name: String,
        #[arg(long)]
        value: String,
        #[arg(long, default_value_t = Timestamp::MIN, allow_hyphen_values = true)]
        mint: Timestamp,
        #[arg(long, default_value_t = Timestamp::MAX, allow_hyphen_values = true)]
        maxt: Timestamp,
        /// Also load each chunk and print its encoding and size.
        #[arg(long, default_value_t = false)]
        chunks: bool,
    },
}

// ---------- File/env config (all optional for partial config) ----------

/// Top-level config as read from file + env. Every field optional for layering.
#[derive(Debug, Default, serde::Deserialize)]
pub struct InspectFileConfig {
    pub block_dir: Option<String>,
    pub reader: Option<ReaderFileConfig>,
}

/// Effective settings after layering.
#[derive(Debug, Clone)]
pub struct InspectOptions {
    pub block_dir: PathBuf,
    pub reader: ReaderOptions,
}

/// Load merged config. CLI overrides file/env.
fn load_config(cli: &Cli) -> Result<InspectOptions, BlockError> {
    let mut builder = Config::builder();

    if !cli.no_config {
        if let Some(ref path) = cli.config {
            if !path.exists() {
                return Err(BlockError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path.as_path()).required(false));
        } else {
            let default_path = PathBuf::from("tsblock.toml");
            if default_path.exists() {
                builder = builder.add_source(File::from(default_path.as_path()).required(false));
            }
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("TSBLOCK")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .ignore_empty(true),
    );

    let merged = builder
        .build()
        .map_err(|e| BlockError::Config(e.to_string()))?;
    let partial: InspectFileConfig = merged
        .try_deserialize()
        .map_err(|e| BlockError::Config(e.to_string()))?;

    let mut reader = ReaderOptions::default().with_event_listener(Arc::new(StderrEventListener));
    if let Some(ref r) = partial.reader {
        reader.merge(r);
    }
    if cli.verify_checksums {
        reader.verify_checksums = true;
    }

    let block_dir = cli
        .block_dir
        .clone()
        .or_else(|| partial.block_dir.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    Ok(InspectOptions { block_dir, reader })
}

// ---------- Diagnostics ----------

/// Writes reader events that indicate a problem to stderr.
#[derive(Debug)]
struct StderrEventListener;

impl BlockEventListener for StderrEventListener {
    fn on_event(&self, event: BlockEvent) {
        match event {
            BlockEvent::IndexOpened { .. } => {}
            BlockEvent::IndexOpenFailed { error } => eprintln!("index open failed: {}", error),
            BlockEvent::SeriesReaderOpenFailed { error } => {
                eprintln!("series reader open failed: {}", error)
            }
            BlockEvent::ChecksumMismatch {
                offset,
                expected,
                actual,
            } => eprintln!(
                "checksum mismatch at offset {}: expected={:#010x} actual={:#010x}",
                offset, expected, actual
            ),
            BlockEvent::SeriesDecodeFailed { series_ref, error } => {
                eprintln!("series {} decode failed: {}", series_ref, error)
            }
        }
    }
}

// ---------- Commands ----------

fn print_series(s: &Series, with_chunks: bool) -> Result<(), BlockError> {
    let labels: Vec<String> = s
        .labels()
        .iter()
        .map(|l| format!("{}={:?}", l.name, l.value))
        .collect();
    println!("{{{}}}", labels.join(", "));
    for meta in s.chunks() {
        if with_chunks {
            let c = s.chunk(meta)?;
            println!(
                "  chunk ref={} min_time={} max_time={} encoding={} bytes={}",
                meta.chunk_ref,
                meta.min_time,
                meta.max_time,
                c.encoding(),
                c.bytes().len()
            );
        } else {
            println!(
                "  chunk ref={} min_time={} max_time={}",
                meta.chunk_ref, meta.min_time, meta.max_time
            );
        }
    }
    Ok(())
}

fn run(command: &Command, block: &Block) -> Result<(), BlockError> {
    let index = block.index();
    match command {
        Command::Stats => {
            let st = index.stats()?;
            println!("min_time={}", st.min_time);
            println!("max_time={}", st.max_time);
            println!("series_count={}", st.series_count);
            println!("chunk_count={}", st.chunk_count);
            println!("sample_count={}", st.sample_count);
        }
        Command::LabelIndices => {
            for names in index.label_indices()? {
                println!("{}", names.join(","));
            }
        }
        Command::LabelValues { names } => {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            for tuple in index.label_values(&names)?.iter() {
                println!("{}", tuple?.join(","));
            }
        }
        Command::Postings { name, value } => {
            for r in index.postings(name, value)? {
                println!("{}", r);
            }
        }
        Command::Series {
            name,
            value,
            mint,
            maxt,
            chunks,
        } => {
            for s in index.select(name, value, *mint, *maxt)? {
                print_series(&s, *chunks)?;
            }
        }
    }
    Ok(())
}

// ---------- Main ----------

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let options = load_config(&cli).map_err(|e| {
        eprintln!("config error: {}", e);
        e
    })?;

    if cli.validate_config {
        println!("block_dir={}", options.block_dir.display());
        println!("verify_checksums={}", options.reader.verify_checksums);
        return Ok(());
    }

    let Some(ref command) = cli.command else {
        eprintln!("no command given (try --help)");
        return Err("missing command".into());
    };

    #[cfg(feature = "prometheus")]
    let metrics = if cli.print_metrics {
        Some(tsblock::telemetry::block_metrics::InProcessPrometheus::install(
            std::time::Duration::from_secs(5),
        )?)
    } else {
        None
    };

    let block = Block::open_with_options(&options.block_dir, &options.reader).map_err(|e| {
        eprintln!("failed to open block {}: {}", options.block_dir.display(), e);
        e
    })?;

    run(command, &block).map_err(|e| {
        eprintln!("query failed: {}", e);
        e
    })?;

    #[cfg(feature = "prometheus")]
    if let Some(m) = metrics {
        print!("{}", m.render());
    }
    Ok(())
}
