//! `booking` CLI: render a calendar file, check a proposed slot, list free time.
//!
//! ## Usage
//!
//! ```sh
//! # Every occurrence (virtual instances included) in the current calendar year
//! booking expand -i calendar.json
//!
//! # Occurrences in an explicit window, calendar read from stdin
//! cat calendar.json | booking expand --from 2026-03-01T00:00:00Z --to 2026-04-01T00:00:00Z
//!
//! # Is 14:00-15:00 free? Exits 1 when the slot is taken.
//! booking check -i calendar.json --start 2026-03-16T14:00:00Z --end 2026-03-16T15:00:00Z
//!
//! # Moving one occurrence: ignore just that row or instance
//! booking check -i calendar.json --start ... --end ... --exclude standup_2026-03-16
//!
//! # Rescheduling a whole series: ignore the parent and every instance
//! booking check -i calendar.json --start ... --end ... --exclude-series standup
//!
//! # Free gaps of at least 30 minutes on one day
//! booking free -i calendar.json --from 2026-03-16T08:00:00Z --to 2026-03-16T18:00:00Z --min-minutes 30
//! ```
//!
//! Settings come from `booking.toml` (or `--config`) and `BOOKING_*` variables;
//! see [`config::Settings`]. Logs go to stderr so stdout stays valid JSON.

mod config;

use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use booking_engine::conflict::find_conflicts;
use booking_engine::event::validate_range;
use booking_engine::time::{parse_timestamp, year_window};
use booking_engine::{
    BookingInterval, BookingRequest, Calendar, CalendarFile, Exclude, GeneratorOptions,
};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Settings;

#[derive(Parser)]
#[command(
    name = "booking",
    version,
    about = "Recurring event expansion and booking conflict checks"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./booking.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// IANA timezone override (e.g. "Asia/Tbilisi")
    #[arg(long, global = true)]
    timezone: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every occurrence in a window, virtual instances included
    Expand {
        /// Calendar JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Window start (defaults to the start of the current calendar year)
        #[arg(long)]
        from: Option<String>,
        /// Window end (defaults to the start of next calendar year)
        #[arg(long)]
        to: Option<String>,
    },
    /// Check whether a proposed slot is free
    Check {
        /// Calendar JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        /// Row or instance id to ignore (the record being edited)
        #[arg(long)]
        exclude: Option<String>,
        /// Series id whose parent and instances are all ignored
        #[arg(long)]
        exclude_series: Option<String>,
        /// Report every conflicting interval instead of the first
        #[arg(long)]
        all: bool,
    },
    /// List free slots between events and approved bookings
    Free {
        /// Calendar JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Drop slots shorter than this
        #[arg(long, default_value_t = 0)]
        min_minutes: i64,
    },
}

#[derive(Serialize)]
struct ConflictReport<'a> {
    available: bool,
    conflicts: Vec<&'a BookingInterval>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(tz) = cli.timezone {
        settings.timezone = tz;
    }
    init_tracing(&settings.log_level);
    debug!(?settings, "loaded settings");

    let options = settings.generator_options()?;

    match cli.command {
        Commands::Expand { input, from, to } => {
            let (_, mut calendar) = load_calendar(input.as_deref(), options)?;
            let (window_start, window_end) = resolve_window(from.as_deref(), to.as_deref(), &options)?;
            let occurrences = calendar.occurrences(window_start, window_end);
            info!(
                events = calendar.len(),
                occurrences = occurrences.len(),
                "expanded calendar"
            );
            print_json(&occurrences)?;
        }
        Commands::Check {
            input,
            start,
            end,
            exclude,
            exclude_series,
            all,
        } => {
            let (bookings, mut calendar) = load_calendar(input.as_deref(), options)?;
            let start = parse_timestamp(&start)?;
            let end = parse_timestamp(&end)?;
            let skip = Exclude {
                id: exclude.as_deref(),
                series: exclude_series.as_deref(),
            };

            let available = if all {
                validate_range(start, end)?;
                let intervals = calendar.committed_intervals(start, end, &bookings);
                let conflicts = find_conflicts(start, end, &intervals, skip);
                let report = ConflictReport {
                    available: conflicts.is_empty(),
                    conflicts,
                };
                print_json(&report)?;
                report.available
            } else {
                let availability =
                    calendar.check_availability_excluding(start, end, &bookings, skip)?;
                print_json(&availability)?;
                if let Some(reason) = availability.describe() {
                    eprintln!("Slot unavailable: {}", reason);
                }
                availability.available
            };

            if !available {
                process::exit(1);
            }
        }
        Commands::Free {
            input,
            from,
            to,
            min_minutes,
        } => {
            let (bookings, mut calendar) = load_calendar(input.as_deref(), options)?;
            let window_start = parse_timestamp(&from)?;
            let window_end = parse_timestamp(&to)?;
            let slots: Vec<_> = calendar
                .free_slots(window_start, window_end, &bookings)
                .into_iter()
                .filter(|slot| slot.duration_minutes >= min_minutes)
                .collect();
            print_json(&slots)?;
        }
    }

    Ok(())
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

/// Parse the calendar file into the event store and its booking requests.
fn load_calendar(
    path: Option<&str>,
    options: GeneratorOptions,
) -> Result<(Vec<BookingRequest>, Calendar)> {
    let json = read_input(path)?;
    let file = CalendarFile::from_json(&json).context("Failed to parse calendar JSON")?;
    let calendar = Calendar::from_events(file.events, options);
    Ok((file.bookings, calendar))
}

/// `--from`/`--to`, each defaulting to the bounds of the current calendar year.
fn resolve_window(
    from: Option<&str>,
    to: Option<&str>,
    options: &GeneratorOptions,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let (year_start, year_end) = year_window(Utc::now(), options.timezone);
    let start = from.map(parse_timestamp).transpose()?.unwrap_or(year_start);
    let end = to.map(parse_timestamp).transpose()?.unwrap_or(year_end);
    anyhow::ensure!(start < end, "Window start must be before window end");
    Ok((start, end))
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

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let pretty = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", pretty);
    Ok(())
}
