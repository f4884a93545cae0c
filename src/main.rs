use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tfv::config::Config;
use tfv::{analysis, Ingestor, LogQuery, Normalizer, SearchIndex, Store};

#[derive(Parser)]
#[command(name = "tfv", about = "Terraform log viewer — ingest, search and triage TF_LOG=json output")]
struct Cli {
    /// Config file to load instead of ~/.config/tfv/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Append diagnostics to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a JSON-lines log file. The file is removed afterwards.
    Ingest {
        file: PathBuf,
        /// Keep the source file.
        #[arg(long)]
        keep: bool,
    },
    /// Report the structure of a log file without storing it.
    Analyze { file: PathBuf },
    /// Ranked full-text search.
    Search {
        query: String,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Filtered listing, newest first.
    List {
        #[arg(long)]
        level: Option<String>,
        #[arg(long)]
        resource_type: Option<String>,
        #[arg(long)]
        request_id: Option<String>,
        #[arg(long, value_parser = parse_time)]
        since: Option<DateTime<Utc>>,
        #[arg(long, value_parser = parse_time)]
        until: Option<DateTime<Utc>>,
        #[arg(long)]
        unread: bool,
        /// Substring match on message and raw payload.
        #[arg(long)]
        text: Option<String>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print one record.
    Show { id: i64 },
    /// Mark one record as read.
    Read { id: i64 },
    /// Every record sharing a request id, oldest first.
    Chain { request_id: String },
    /// Aggregate counts over the store.
    Stats,
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    tfv::normalizer::timestamp::parse(s)
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| format!("unrecognised timestamp: {s}"))
}

fn init_tracing(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_env_filter(filter)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    serde_json::to_writer_pretty(stdout.lock(), value)?;
    println!();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_ref())?;

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("loading configuration")?;

    // Analysis never touches the store.
    let command = match cli.command {
        Command::Analyze { file } => {
            let structure = analysis::analyze_file(&file)
                .with_context(|| format!("analyzing {}", file.display()))?;
            return print_json(&structure);
        }
        other => other,
    };

    let store = Store::open(config.store.clone()).context("opening log store")?;
    let index = SearchIndex::open(store.clone(), config.search.clone());

    match command {
        Command::Analyze { .. } => Ok(()),
        Command::Ingest { file, keep } => {
            let mut ingest = config.ingest.clone();
            ingest.delete_source &= !keep;
            let ingestor = Ingestor::with_config(store, Normalizer::new(), &ingest);
            let stats = ingestor
                .ingest_file_in_background(file.clone())
                .await
                .with_context(|| format!("ingesting {}", file.display()))?;
            print_json(&stats)
        }
        Command::Search { query, offset, limit } => {
            let limit = limit.unwrap_or(config.search.default_limit);
            print_json(&index.search_page(&query, offset, limit)?)
        }
        Command::List {
            level,
            resource_type,
            request_id,
            since,
            until,
            unread,
            text,
            offset,
            limit,
        } => {
            let mut query = LogQuery::new()
                .between(since, until)
                .offset(offset)
                .limit(limit.unwrap_or(config.search.default_limit));
            if let Some(level) = level {
                query = query.level(level);
            }
            if let Some(rt) = resource_type {
                query = query.resource_type(rt);
            }
            if let Some(id) = request_id {
                query = query.request_id(id);
            }
            if let Some(text) = text {
                query = query.text(text);
            }
            if unread {
                query = query.unread_only();
            }
            print_json(&index.filter(&query)?)
        }
        Command::Show { id } => print_json(&store.require(id)?),
        Command::Read { id } => {
            if !store.mark_read(id)? {
                anyhow::bail!("no log with id {id}");
            }
            print_json(&store.require(id)?)
        }
        Command::Chain { request_id } => print_json(&store.chain(&request_id)?),
        Command::Stats => print_json(&store.stats()?),
    }
}
