//! `availability` CLI: query bookable windows from a schedule snapshot.
//!
//! The snapshot is a JSON document holding items, locations, provider/item
//! offerings, weekly schedule templates and appointments.
//!
//! ## Usage
//!
//! ```sh
//! # Windows for item 100 at location 10, as JSON on stdout
//! availability query -i store.json --item 100 --location 10
//!
//! # Override the minimum duration and show New York times
//! availability query -i store.json --item 100 --location 10 \
//!     --min-duration 30 --timezone America/New_York
//!
//! # Human-readable lines, as handed to the assistant
//! availability query -i store.json --item 100 --location 10 --format text
//!
//! # Concrete schedule windows a provider's templates expand to
//! availability expand -i store.json --provider 1 --location 10
//! ```
//!
//! `AVAILABILITY_LOOKAHEAD_DAYS` and `AVAILABILITY_DEFAULT_TIMEZONE` are read
//! from the environment; flags take precedence. Logs go to stderr, filtered by
//! `--log-level` or `RUST_LOG`.

use std::io::{self, Read};
use std::sync::Arc;

use anyhow::{Context, Result};
use availability_engine::memory::InMemoryStore;
use availability_engine::ports::ScheduleRepository;
use availability_engine::{
    parse_timezone, render_tool_result, AvailabilityQuery, LocationId, ProviderId, Scheduler,
    SchedulerConfig,
};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "availability",
    version,
    about = "Bookable availability from provider schedules and appointments"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log filter used when RUST_LOG is unset (e.g. "info", "availability_engine=debug")
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List bookable windows for an item at a location
    Query {
        /// Snapshot JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Bookable item id
        #[arg(long)]
        item: i64,
        /// Location id
        #[arg(long)]
        location: i64,
        /// Minimum window length in minutes (defaults to the item's duration)
        #[arg(long)]
        min_duration: Option<u32>,
        /// IANA timezone for displayed times
        #[arg(long)]
        timezone: Option<String>,
        /// Evaluate as of this RFC 3339 instant instead of the current time
        #[arg(long)]
        now: Option<String>,
        /// Days ahead to consider
        #[arg(long)]
        lookahead_days: Option<u32>,
        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: Format,
    },
    /// Print the schedule windows a provider's templates expand to
    Expand {
        /// Snapshot JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Provider id
        #[arg(long)]
        provider: i64,
        /// Location id
        #[arg(long)]
        location: i64,
        /// Expand from this RFC 3339 instant instead of the current time
        #[arg(long)]
        now: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Query {
            input,
            item,
            location,
            min_duration,
            timezone,
            now,
            lookahead_days,
            format,
        } => {
            let mut store = load_store(input.as_deref())?;

            let mut config =
                SchedulerConfig::from_env().context("Invalid scheduler configuration in environment")?;
            if let Some(days) = lookahead_days {
                config.lookahead_days = days;
            }
            config.validate()?;
            tracing::debug!(?config, "scheduler configuration");

            // Templates must expand at least as far as the horizon reaches.
            store.expansion_days = store.expansion_days.max(config.lookahead_days);
            let store = Arc::new(store);

            let mut query = AvailabilityQuery::new(item, location);
            query.min_duration_minutes = min_duration;
            if let Some(name) = timezone.as_deref() {
                query.timezone = Some(parse_timezone(name)?);
            }

            let now = parse_now(now.as_deref())?;
            let scheduler = Scheduler::new(store.clone(), store.clone(), store.clone(), store, config);
            let windows = scheduler
                .get_availabilities_at(&query, now)
                .await
                .context("Failed to compute availability")?;

            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&windows)?),
                Format::Text if windows.is_empty() => println!("No availability."),
                Format::Text => println!("{}", render_tool_result(&windows)),
            }
        }
        Commands::Expand {
            input,
            provider,
            location,
            now,
        } => {
            let store = load_store(input.as_deref())?;
            let now = parse_now(now.as_deref())?;
            let windows = store
                .forward_windows(ProviderId(provider), LocationId(location), now)
                .await
                .context("Failed to expand schedule templates")?;
            println!("{}", serde_json::to_string_pretty(&windows)?);
        }
    }

    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn parse_now(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .with_context(|| format!("Invalid --now instant: {}", raw)),
        None => Ok(Utc::now()),
    }
}

fn load_store(path: Option<&str>) -> Result<InMemoryStore> {
    let json = read_input(path)?;
    serde_json::from_str(&json).context("Failed to parse schedule snapshot")
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}
