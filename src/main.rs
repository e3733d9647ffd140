mod anomaly;
mod cache;
mod config;
mod data;
mod engine;
mod manager;
mod model;
mod stats;
mod utils;
mod weather;

use crate::manager::{LiveSource, Manager, TrendWindow};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_TREND_DAYS: i64 = 365;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    work_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the cities present in the dataset.
    Cities,

    /// Enrich a city's history and write a report.
    Analyze {
        #[arg(long)]
        city: String,

        /// First day of the trend window (defaults to `days` before the latest observation).
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Length of the trend window in days (50 to 365).
        #[arg(long)]
        days: Option<i64>,
    },

    /// Compare a live temperature against the seasonal baseline.
    Check {
        #[arg(long)]
        city: String,

        #[arg(long)]
        api_key: Option<String>,

        /// Use this reading instead of querying the weather service.
        #[arg(long, allow_negative_numbers = true, value_parser = parse_temperature)]
        temperature: Option<f64>,

        /// Calendar month to take the season from (defaults to the current month).
        #[arg(long)]
        month: Option<u32>,
    },

    /// Remove cached series and results.
    Clean,
}

fn parse_temperature(arg: &str) -> Result<f64, String> {
    let temp: f64 = arg.parse().map_err(|e| format!("{e}"))?;
    if !temp.is_finite() {
        return Err(format!("{arg:?} is not a finite temperature"));
    }
    Ok(temp)
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(&args.work_dir).context("failed to construct mgr")?;

    match args.command {
        Command::Cities => {
            for city in mgr.list_cities()? {
                println!("{city}");
            }
        }
        Command::Analyze { city, start, days } => {
            let trend = (start.is_some() || days.is_some()).then(|| TrendWindow {
                start,
                days: days.unwrap_or(DEFAULT_TREND_DAYS),
            });
            let report = mgr.analyze_city(&city, trend)?;
            println!("{report}");
        }
        Command::Check {
            city,
            api_key,
            temperature,
            month,
        } => {
            let source = match temperature {
                Some(temp) => LiveSource::Reading(temp),
                None => LiveSource::Fetch(api_key),
            };
            let month = month.unwrap_or_else(manager::current_month);
            let report = mgr.check_city(&city, month, source)?;
            let report = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
            println!("{report}");
        }
        Command::Clean => mgr.clean()?,
    }

    Ok(())
}
