//! appsearch: ingest grant-round applications and search them.
//!
//! # Usage
//!
//! ```bash
//! appsearch ingest --locators 10:0xabc,1:0xdef
//! appsearch search "open source --strategy=fulltext"
//! appsearch show 10:0xabc:4
//! appsearch download --chain-id 10 --round-ids 0xabc --dir ./mirror
//! appsearch serve --from-dir ./mirror
//! ```

mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use appsearch_core::config::Settings;
use appsearch_core::error::Error;
use appsearch_core::types::ApplicationFileLocator;
use appsearch_data::{spawn_refresh_loop, DataSource, Dataset, DirectorySource, IndexerClient, RefreshJob};
use appsearch_embed::get_default_embedder;
use appsearch_text::TantivyIndex;
use appsearch_vector::LanceSemanticIndex;

type AppDataset = Dataset<TantivyIndex, LanceSemanticIndex>;

const CRATES: &[&str] = &["appsearch_cli", "appsearch_core", "appsearch_text", "appsearch_embed", "appsearch_vector", "appsearch_hybrid", "appsearch_data"];

/// Hybrid search over grant-round applications.
///
/// Settings come from `appsearch.toml`, `appsearch.<RUST_ENV>.toml` and
/// `APP_*` environment variables.
#[derive(Parser)]
#[command(name = "appsearch", version, about)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch, index and persist a new snapshot
    Ingest {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Run a query against the latest snapshot
    Search {
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Print one application summary
    Show { application_ref: String },
    /// Print every application summary
    List {
        #[arg(long)]
        json: bool,
    },
    /// Mirror raw application files for offline ingestion
    Download {
        #[arg(long)]
        chain_id: u64,
        #[arg(long, value_delimiter = ',', required = true)]
        round_ids: Vec<String>,
        #[arg(long)]
        dir: PathBuf,
    },
    /// Serve queries from stdin while refreshing in the background
    Serve {
        #[command(flatten)]
        source: SourceArgs,
        /// Only pick up snapshots written by another process
        #[arg(long)]
        reload_only: bool,
    },
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Comma separated `<chain_id>:0x<round_id>` list; defaults to the configured one
    #[arg(long)]
    locators: Option<String>,

    /// Read a mirrored layout instead of the indexer
    #[arg(long)]
    from_dir: Option<PathBuf>,
}

fn init_logging(verbose: u8, json: bool) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let directives = CRATES.iter().fold("warn".to_string(), |acc, krate| format!("{acc},{krate}={level}"));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open_dataset(settings: &Settings) -> Result<AppDataset> {
    let embedder = get_default_embedder(&settings.embedding).context("loading embedder")?;
    Ok(Dataset::from_settings(settings, embedder))
}

fn resolve_locators(args: &SourceArgs, settings: &Settings) -> Result<Vec<ApplicationFileLocator>> {
    let mut locators = match &args.locators {
        Some(list) => appsearch_core::types::parse_locators(list)?,
        None => settings.locators()?,
    };
    if locators.is_empty() {
        if let Some(dir) = &args.from_dir {
            locators = DirectorySource::new(dir).list_locators()?;
        }
    }
    Ok(locators)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);
    let settings = Settings::load().context("loading settings")?;

    match cli.command {
        Command::Ingest { source } => {
            let locators = resolve_locators(&source, &settings)?;
            if locators.is_empty() {
                anyhow::bail!("no application file locators configured");
            }
            let dataset = open_dataset(&settings)?;
            let report = match &source.from_dir {
                Some(dir) => dataset.ingest_and_persist(&DirectorySource::new(dir), &locators).await?,
                None => dataset.ingest_and_persist(&indexer(&settings)?, &locators).await?,
            };
            println!("{}", output::format_report(&report));
        }
        Command::Search { query, json } => {
            let dataset = open_dataset(&settings)?;
            dataset.reload().await?;
            let hits = dataset.search_with_summaries(&query).await?;
            println!("{}", if json { output::format_json(&hits)? } else { output::format_hits(&query, &hits) });
        }
        Command::Show { application_ref } => {
            let dataset = open_dataset(&settings)?;
            dataset.reload().await?;
            println!("{}", serde_json::to_string_pretty(&dataset.get_summary(&application_ref)?)?);
        }
        Command::List { json } => {
            let dataset = open_dataset(&settings)?;
            dataset.reload().await?;
            let summaries = dataset.list_summaries();
            println!("{}", if json { output::format_json(&summaries)? } else { output::format_summaries(&summaries) });
        }
        Command::Download { chain_id, round_ids, dir } => download(&settings, chain_id, &round_ids, dir).await?,
        Command::Serve { source, reload_only } => {
            let locators = if reload_only { Vec::new() } else { resolve_locators(&source, &settings)? };
            let dataset = Arc::new(open_dataset(&settings)?);
            match &source.from_dir {
                Some(dir) => serve(dataset, Arc::new(DirectorySource::new(dir)), locators, &settings).await?,
                None => serve(dataset, Arc::new(indexer(&settings)?), locators, &settings).await?,
            }
        }
    }
    Ok(())
}

fn indexer(settings: &Settings) -> Result<IndexerClient> { Ok(IndexerClient::new(&settings.indexer_base_url, settings.fetch_timeout())?) }

async fn download(settings: &Settings, chain_id: u64, round_ids: &[String], dir: PathBuf) -> Result<()> {
    let client = indexer(settings)?;
    let mirror = DirectorySource::new(dir);
    for round_id in round_ids {
        let locator: ApplicationFileLocator = format!("{chain_id}:{round_id}").parse()?;
        let records = client.fetch_applications(&locator).await?;
        let path = mirror.store_applications(&locator, &records)?;
        println!("{locator}: {} records -> {}", records.len(), path.display());
    }
    match client.fetch_rounds_raw(chain_id).await {
        Ok(rounds) => {
            mirror.store_rounds(chain_id, &rounds)?;
        }
        Err(e) => warn!(chain_id, error = %e, "round list not mirrored"),
    }
    Ok(())
}

async fn serve<D: DataSource + 'static>(dataset: Arc<AppDataset>, source: Arc<D>, locators: Vec<ApplicationFileLocator>, settings: &Settings) -> Result<()> {
    match dataset.reload().await {
        Ok(version) => info!(%version, "serving snapshot"),
        Err(Error::NotFound(_)) if !locators.is_empty() => {
            info!("no snapshot yet, ingesting");
            dataset.refresh(source.as_ref(), &locators).await?;
        }
        Err(e) => return Err(e.into()),
    }

    let job = if locators.is_empty() { RefreshJob::ReloadOnly } else { RefreshJob::IngestAndReload { locators } };
    let (shutdown, shutdown_rx) = watch::channel(false);
    let refresher = spawn_refresh_loop(dataset.clone(), source, job, settings.refresh_interval(), shutdown_rx);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("Enter a query per line, Ctrl-D to quit.");
    while let Some(line) = lines.next_line().await? {
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        match dataset.search_with_summaries(query).await {
            Ok(hits) => println!("{}", output::format_hits(query, &hits)),
            Err(e) => eprintln!("error: {e}"),
        }
    }

    shutdown.send(true).ok();
    refresher.await?;
    Ok(())
}
