use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dvf_pipeline::{
    aggregate, config::Config, context::PipelineContext, fetch, metrics::LogMetrics,
    notify::LogNotifier, process, storage::LocalDirStore,
};
use reqwest::Client;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "dvf_pipeline")]
#[command(about = "DVF real-estate batch ETL: ingest, normalize, aggregate")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the published DVF archives into bronze storage
    Ingest {
        /// Only ingest this vintage (e.g. 2024)
        #[arg(long)]
        year: Option<String>,
        /// Path to an optional trigger payload JSON carrying a year filter
        #[arg(long)]
        event: Option<PathBuf>,
    },
    /// Normalize triggered bronze archives into silver tables
    BronzeToSilver {
        /// Path to the trigger payload JSON
        #[arg(long)]
        event: PathBuf,
    },
    /// Count transactions per category over triggered silver tables
    CountByType {
        /// Path to the trigger payload JSON
        #[arg(long)]
        event: PathBuf,
        /// Partition counts by postal code
        #[arg(long)]
        by_postal: bool,
    },
    /// Average price per area over triggered silver tables
    PriceM2 {
        /// Path to the trigger payload JSON
        #[arg(long)]
        event: PathBuf,
    },
}

fn load_event(path: &PathBuf) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading trigger payload {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing trigger payload {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,dvf_pipeline=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    let cli = Cli::parse();

    let config = Config::from_env();
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;
    let ctx = PipelineContext::new(
        config.clone(),
        Arc::new(LocalDirStore::new(&config.data_dir)),
        Arc::new(LogNotifier),
        Arc::new(LogMetrics),
    );

    let summary = match cli.command {
        Commands::Ingest { year, event } => {
            let year = match (year, event) {
                (Some(y), _) => Some(y),
                (None, Some(path)) => fetch::target_year_from_event(&load_event(&path)?),
                (None, None) => None,
            };
            let client = Client::new();
            let summary = fetch::ingest_to_bronze(&ctx, &client, year.as_deref()).await?;
            serde_json::to_value(summary)?
        }
        Commands::BronzeToSilver { event } => {
            let event = load_event(&event)?;
            let summary = process::bronze_to_silver(&ctx, &event).await?;
            serde_json::to_value(summary)?
        }
        Commands::CountByType { event, by_postal } => {
            let event = load_event(&event)?;
            let summary = aggregate::gold_count_by_type(&ctx, &event, by_postal).await?;
            serde_json::to_value(summary)?
        }
        Commands::PriceM2 { event } => {
            let event = load_event(&event)?;
            let summary = aggregate::gold_price_m2(&ctx, &event).await?;
            serde_json::to_value(summary)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
