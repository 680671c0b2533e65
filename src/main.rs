//! CLI entry point for the port weather risk tool.
//!
//! Provides subcommands for seeding locations, ingesting observations from the
//! configured weather provider, and querying the overview, trend, comparison
//! and live views.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use port_weather::analyzers::analyzer::{
    DEFAULT_COMPARISON_DAYS, DEFAULT_LIVE_HOURS, DEFAULT_OVERVIEW_HOURS, DEFAULT_TREND_DAYS,
    comparison, live, overview, trends,
};
use port_weather::config::Settings;
use port_weather::infra::build_provider;
use port_weather::ingest::Ingestor;
use port_weather::output::{OutputFormat, write_result};
use port_weather::services::weather_api::ProviderKind;
use port_weather::store::{CsvStore, LocationFilter, SampleStore, default_locations};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "port_weather")]
#[command(about = "Weather risk analytics for ports and shipping routes", long_about = None)]
struct Cli {
    /// Output format for command results
    #[arg(short, long, value_enum, global = true, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Data directory (overrides DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default ports and routes to the location file
    Seed,
    /// List known locations
    Locations,
    /// Fetch observations for one or all locations and store them
    Ingest {
        /// Only ingest this location id
        #[arg(short, long)]
        location_id: Option<String>,

        /// Fetch one observation per day over the last N days instead of current conditions
        #[arg(short, long)]
        days: Option<u32>,

        /// Provider to use (overrides WEATHER_PROVIDER)
        #[arg(short, long, value_enum)]
        provider: Option<ProviderKind>,
    },
    /// Rolling statistics over all locations
    Overview {
        #[arg(long, default_value_t = DEFAULT_OVERVIEW_HOURS)]
        hours: u32,
    },
    /// Daily aggregates per location
    Trends {
        #[arg(long, default_value_t = DEFAULT_TREND_DAYS)]
        days: u32,
    },
    /// Per-location summary over the last N days
    Comparison {
        #[arg(long, default_value_t = DEFAULT_COMPARISON_DAYS)]
        days: u32,
    },
    /// Most recent observation per location
    Live {
        #[arg(long, default_value_t = DEFAULT_LIVE_HOURS)]
        hours: u32,
    },
    /// Recent ingestion attempts
    FetchLog {
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let settings = Settings::from_env()?;
    let _file_guard = init_tracing(&settings.log_file_path)?;

    let cli = Cli::parse();
    let data_dir = cli.data_dir.clone().unwrap_or_else(|| settings.data_dir.clone());
    let store: Arc<dyn SampleStore> = Arc::new(CsvStore::open(&data_dir)?);
    let mut out = std::io::stdout().lock();
    let now = Utc::now();

    match cli.command {
        Commands::Seed => {
            let locations = default_locations();
            let written = store.upsert_locations(&locations)?;
            info!(written, data_dir = %data_dir.display(), "Seeded locations");
            let all = store.find_locations(&LocationFilter::default())?;
            write_result(&mut out, cli.format, &all)?;
        }
        Commands::Locations => {
            let mut locations = store.find_locations(&LocationFilter::default())?;
            locations.sort_by(|a, b| a.name.cmp(&b.name));
            write_result(&mut out, cli.format, &locations)?;
        }
        Commands::Ingest {
            location_id,
            days,
            provider,
        } => {
            let kind = provider.unwrap_or(settings.provider);
            let provider = build_provider(kind, settings.api_key.clone())
                .context("Failed to build weather provider")?;
            let ingestor = Ingestor::new(provider, store.clone()).with_concurrency(settings.concurrency);

            let report = ingestor.ingest_many(location_id.as_deref(), days).await?;
            if report.locations.is_empty() {
                bail!("No matching locations");
            }

            write_result(&mut out, cli.format, &report)?;

            if report.ingested == 0 {
                warn!(failed = report.results.len(), "Every ingestion failed");
                bail!("All {} ingestions failed", report.results.len());
            }
        }
        Commands::Overview { hours } => {
            write_result(&mut out, cli.format, &overview(store.as_ref(), hours, now)?)?;
        }
        Commands::Trends { days } => {
            write_result(&mut out, cli.format, &trends(store.as_ref(), days, now)?)?;
        }
        Commands::Comparison { days } => {
            write_result(&mut out, cli.format, &comparison(store.as_ref(), days, now)?)?;
        }
        Commands::Live { hours } => {
            write_result(&mut out, cli.format, &live(store.as_ref(), hours, now)?)?;
        }
        Commands::FetchLog { limit } => {
            write_result(&mut out, cli.format, &store.recent_fetch_log(limit)?)?;
        }
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_tracing(log_file_path: &Path) -> Result<WorkerGuard> {
    let log_dir = log_file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = log_file_path
        .file_name()
        .unwrap_or(OsStr::new("port_weather.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}
