//! Command line interface for sharing, profiling and padding tables.
use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde::{Serialize, de::DeserializeOwned};
use shareprep::{
    classify::{Classifier, Record},
    config::SharingConfig,
    pad::pad_table,
    party::Party,
    profile::{ColumnWidths, LengthProfiler},
    table::{PartyTable, share_table_parallel},
};
use tokio::fs;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Prepares JSON tables as replicated secret shares for three computing parties.
///
/// Logging can be controlled with an EnvFilter via the `SHAREPREP_LOG` environment
/// variable.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// JSON sharing configuration. The built-in column sets are used if omitted.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Shares a table (a JSON array of records) into one table per party.
    Share {
        /// The plaintext table.
        #[arg(long, short)]
        input: PathBuf,
        /// Directory receiving `p1/`, `p2/` and `p3/`.
        #[arg(long, short)]
        out_dir: PathBuf,
        /// Number of concurrent sharing workers. Defaults to the available parallelism.
        #[arg(long, short)]
        workers: Option<NonZeroUsize>,
    },
    /// Computes the column widths of one or more tables of a single party.
    Profile {
        /// Where to write the column widths.
        #[arg(long, short)]
        output: PathBuf,
        /// Per-party tables sharing one schema.
        #[arg(required = true)]
        tables: Vec<PathBuf>,
    },
    /// Pads every record of a per-party table to a fixed-width row of hex encoded blocks.
    Pad {
        /// Column widths written by `profile`.
        #[arg(long)]
        widths: PathBuf,
        /// The per-party table.
        #[arg(long, short)]
        input: PathBuf,
        /// Where to write the padded rows.
        #[arg(long, short)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing().context("tracing initialization")?;

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => SharingConfig::load(path).await?,
        None => SharingConfig::default(),
    };
    let classifier = Classifier::new(config)?;
    info!(schema = classifier.fingerprint(), "loaded sharing configuration");

    match cli.command {
        Command::Share {
            input,
            out_dir,
            workers,
        } => share(classifier, &input, &out_dir, workers).await,
        Command::Profile { output, tables } => profile(&classifier, &tables, &output).await,
        Command::Pad {
            widths,
            input,
            output,
        } => pad(&classifier, &widths, &input, &output).await,
    }
}

async fn share(
    classifier: Classifier,
    input: &Path,
    out_dir: &Path,
    workers: Option<NonZeroUsize>,
) -> anyhow::Result<()> {
    let Some(stem) = input.file_stem().and_then(|stem| stem.to_str()) else {
        bail!("cannot derive an output name from {}", input.display());
    };
    let table: Vec<Record> = read_json(input).await?;
    let workers = match workers {
        Some(workers) => workers,
        None => thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
    };
    info!(records = table.len(), workers = workers.get(), "sharing {}", input.display());
    let tables = share_table_parallel(table, Arc::new(classifier), workers.get()).await?;
    for (party, table) in Party::ALL.into_iter().zip(tables.into_tables()) {
        let dir = out_dir.join(party.to_string());
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
        write_json(&dir.join(format!("{stem}_{party}.json")), &table).await?;
    }
    Ok(())
}

async fn profile(classifier: &Classifier, tables: &[PathBuf], output: &Path) -> anyhow::Result<()> {
    let mut profiler = LengthProfiler::new(classifier);
    for path in tables {
        let table: PartyTable = read_json(path).await?;
        profiler
            .observe_table(&table)
            .with_context(|| format!("profiling {}", path.display()))?;
    }
    let widths = profiler.finish()?;
    info!(columns = widths.len(), "writing column widths");
    write_json(output, &widths).await
}

async fn pad(
    classifier: &Classifier,
    widths: &Path,
    input: &Path,
    output: &Path,
) -> anyhow::Result<()> {
    let widths: ColumnWidths = read_json(widths).await?;
    let table: PartyTable = read_json(input).await?;
    let rows: Vec<String> = pad_table(&table, &widths, classifier)?
        .iter()
        .map(|row| row.iter().map(|block| block.to_string()).collect())
        .collect();
    info!(records = rows.len(), "writing padded rows");
    write_json(output, &rows).await
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let json = fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&json).with_context(|| format!("parsing {}", path.display()))
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    fs::write(path, json)
        .await
        .with_context(|| format!("writing {}", path.display()))
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_env_var("SHAREPREP_LOG")
        .with_default_directive("shareprep=info".parse()?)
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
