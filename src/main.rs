//! filemeta - Incremental file and directory metadata scanner.
//!
//! Usage:
//!   filemeta scan <PATH>     Scan a tree and emit one JSON event per record
//!   filemeta record <PATH>   Show the metadata record for a single path
//!   filemeta hash <FILE>     Print the SHA-224 digest of a file
//!   filemeta --help          Show help

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use filemeta_core::{
    AceRendering, Checkpoint, CheckpointStore, EventMetadata, EventSink, JsonCheckpointStore,
    JsonLinesSink, ScanError, ScanEvent, ScanRequest, parse_data_size, parse_duration,
};
use filemeta_scan::{MetaScanner, ScanResult, hash_file};

#[derive(Parser)]
#[command(
    name = "filemeta",
    version,
    about = "Incremental file and directory metadata scanner",
    long_about = "filemeta walks a directory tree and emits one JSON event per file or \
                  directory with its timestamps, size, ownership, ACL data and optional \
                  SHA-224 hash.\n\n\
                  With a checkpoint directory, repeated scans only report what changed \
                  since the previous run."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a path and emit JSON-lines events
    Scan(ScanArgs),

    /// Show the metadata record for a single path
    Record {
        /// Path to inspect
        path: PathBuf,

        /// Include a content hash
        #[arg(long)]
        hash: bool,

        /// Largest file to hash (e.g., "500mb", "1g")
        #[arg(long, default_value = "500mb")]
        hash_limit: String,
    },

    /// Print the SHA-224 digest of a file
    Hash {
        /// File to hash
        path: PathBuf,
    },
}

#[derive(clap::Args)]
struct ScanArgs {
    /// Path to scan
    path: PathBuf,

    /// Only record the path itself
    #[arg(long)]
    no_recurse: bool,

    /// Only emit entries changed since the last checkpoint
    #[arg(long)]
    only_if_changed: bool,

    /// Maximum descent below the root (0 = unlimited)
    #[arg(short, long, default_value = "0")]
    depth_limit: u32,

    /// Wildcard matched against the full path of files (e.g., "*.log")
    #[arg(short, long)]
    filter: Option<String>,

    /// Compute SHA-224 hashes of files
    #[arg(long)]
    hash: bool,

    /// Largest file to hash (e.g., "500mb", "1g")
    #[arg(long, default_value = "500mb")]
    hash_limit: String,

    /// Minimum time between scans (e.g., "15m", "1h", "1d")
    #[arg(short, long, default_value = "1h")]
    interval: String,

    /// Directory holding checkpoints; without it nothing is persisted
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,

    /// Checkpoint key (defaults to "file_meta_data://<PATH>")
    #[arg(long)]
    stanza: Option<String>,

    /// Scan even if the interval has not elapsed
    #[arg(long)]
    force: bool,

    /// How ACE types, flags and permissions are rendered
    #[arg(long, default_value = "multi")]
    ace_format: AceFormat,

    /// Destination index
    #[arg(long, default_value = "default")]
    index: String,

    /// Event source (defaults to the stanza)
    #[arg(long)]
    source: Option<String>,

    /// Event sourcetype
    #[arg(long, default_value = "file_meta_data")]
    sourcetype: String,

    /// Originating host
    #[arg(long)]
    host: Option<String>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum AceFormat {
    #[default]
    Multi,
    Joined,
}

impl From<AceFormat> for AceRendering {
    fn from(format: AceFormat) -> Self {
        match format {
            AceFormat::Multi => AceRendering::Multi,
            AceFormat::Joined => AceRendering::Joined,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Command::Scan(args) => run_scan(args)?,
        Command::Record {
            path,
            hash,
            hash_limit,
        } => run_record(&path, hash, &hash_limit)?,
        Command::Hash { path } => run_hash(&path)?,
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Run one scan with checkpointing and emit events.
fn run_scan(args: ScanArgs) -> Result<()> {
    let hash_size_limit = parse_data_size(&args.hash_limit)?;
    let interval = parse_duration(&args.interval)?;
    let stanza = args
        .stanza
        .clone()
        .unwrap_or_else(|| format!("file_meta_data://{}", args.path.display()));

    let store = args.checkpoint_dir.as_ref().map(JsonCheckpointStore::new);
    let previous = store.as_ref().and_then(|s| s.load(&stanza));
    let now = Utc::now().timestamp();

    if let Some(checkpoint) = previous.filter(|c| !args.force && !c.is_due(interval, now)) {
        info!(
            stanza = %stanza,
            last_run = checkpoint.last_run,
            "Interval has not elapsed, skipping scan"
        );
        return Ok(());
    }

    let mut builder = ScanRequest::builder();
    builder
        .root(args.path.clone())
        .recurse(!args.no_recurse)
        .only_if_changed(args.only_if_changed)
        .depth_limit(args.depth_limit)
        .hash_enabled(args.hash)
        .hash_size_limit(hash_size_limit)
        .previous_high_water_mark(Checkpoint::high_water_mark(previous.as_ref()))
        .ace_rendering(AceRendering::from(args.ace_format));
    if let Some(filter) = &args.filter {
        builder.name_filter(filter.clone());
    }
    let request = builder
        .build()
        .map_err(ScanError::from)
        .context("Invalid scan configuration")?;

    debug!(stanza = %stanza, ?request, "Scan request");

    let scanner = MetaScanner::new();
    let result = scanner.scan(&request).context("Scan failed")?;
    let completed_at = Utc::now().timestamp();

    let metadata = EventMetadata {
        index: args.index.clone(),
        source: args.source.clone().unwrap_or_else(|| stanza.clone()),
        sourcetype: args.sourcetype.clone(),
        host: args.host.clone(),
    };
    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Unable to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut sink = JsonLinesSink::new(writer);
    for record in &result.records {
        let event = ScanEvent::from_record(record, request.ace_rendering, completed_at, &metadata);
        sink.emit(&event).context("Unable to write event")?;
    }
    sink.flush().context("Unable to write event")?;

    if let Some(store) = &store {
        let checkpoint =
            Checkpoint::advance(previous.as_ref(), completed_at, result.new_high_water_mark);
        store
            .save(&stanza, &checkpoint)
            .context("Unable to save checkpoint")?;
    }

    print_summary(&result, sink.written());
    Ok(())
}

/// Print a one-line scan summary to stderr.
fn print_summary(result: &ScanResult, events: u64) {
    let bytes: u64 = result
        .records
        .iter()
        .filter(|r| !r.is_directory)
        .map(|r| r.size)
        .sum();

    eprintln!(
        " {} event(s), {} in files, {} entries visited, {} warning(s), scanned in {:.2}s",
        events,
        format_size(bytes),
        result.entries_visited,
        result.warnings.len(),
        result.duration.as_secs_f64()
    );
}

/// Show the record for a single path.
fn run_record(path: &Path, hash: bool, hash_limit: &str) -> Result<()> {
    let request = ScanRequest::builder()
        .root(path)
        .hash_enabled(hash)
        .hash_size_limit(parse_data_size(hash_limit)?)
        .build()
        .map_err(ScanError::from)?;

    let scanner = MetaScanner::new();
    let mut warnings = Vec::new();
    let record = scanner
        .record_builder(&request)
        .build(path, &mut warnings)
        .with_context(|| format!("Unable to read {}", path.display()))?;

    println!("{}", serde_json::to_string_pretty(&record)?);

    if !warnings.is_empty() {
        eprintln!("{} warning(s)", warnings.len());
    }
    Ok(())
}

/// Print the SHA-224 digest of a file.
fn run_hash(path: &Path) -> Result<()> {
    let hash = hash_file(path).with_context(|| format!("Unable to hash {}", path.display()))?;
    println!("{hash}  {}", path.display());
    Ok(())
}

/// Format bytes as human-readable size.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
