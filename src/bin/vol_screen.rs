//! Vol screener CLI
//!
//! Screens one symbol at a time against live Yahoo data (cached per day) or
//! a saved snapshot, and maintains the local earnings log.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use vol_screener::engine::fetch_macro_status;
use vol_screener::prelude::*;

#[derive(Parser)]
#[command(version, about = "Implied vs realized volatility screener")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Evaluation date (YYYY-MM-DD). Defaults to the capture date of a
    /// `--snapshot` file, else the local date
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Full screen: signal, recommendation and trade setup
    Screen {
        symbol: String,
        /// Evaluate a saved snapshot instead of fetching
        #[arg(long, value_name = "FILE")]
        snapshot: Option<PathBuf>,
        /// Print the full report instead of the summary
        #[arg(long)]
        raw: bool,
        /// Ignore today's cached snapshot
        #[arg(long)]
        refresh: bool,
    },
    /// Volatility signal only
    Signal {
        symbol: String,
        #[arg(long, value_name = "FILE")]
        snapshot: Option<PathBuf>,
    },
    /// Fetch and save a snapshot for offline evaluation
    Snapshot {
        symbol: String,
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },
    /// Earnings log
    Earnings {
        #[command(subcommand)]
        sub: EarningsCmd,
    },
    /// Snapshot cache maintenance
    Cache {
        #[command(subcommand)]
        sub: CacheCmd,
    },
}

#[derive(Subcommand)]
enum CacheCmd {
    /// Symbols with a cached snapshot
    List,
    /// Remove cached snapshots for one symbol, or all of them
    Clear {
        #[arg(long)]
        symbol: Option<String>,
    },
}

#[derive(Subcommand)]
enum EarningsCmd {
    Add {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, value_enum, default_value_t = TimingArg::Unknown)]
        timing: TimingArg,
        #[arg(long)]
        eps_estimate: Option<f64>,
    },
    /// Record every event in a JSON array file
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    List {
        /// Only events within this many days of today
        #[arg(long)]
        days: Option<i64>,
        #[arg(long)]
        symbol: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TimingArg {
    Bmo,
    Amc,
    Unknown,
}

impl From<TimingArg> for EarningsTiming {
    fn from(t: TimingArg) -> Self {
        match t {
            TimingArg::Bmo => EarningsTiming::BeforeOpen,
            TimingArg::Amc => EarningsTiming::AfterClose,
            TimingArg::Unknown => EarningsTiming::Unknown,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> VolResult<()> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| VolError::Serialization(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

fn fetcher(config: &AppConfig) -> VolResult<CachedFetcher<YahooClient>> {
    let client = YahooClient::new(config.provider.clone())?;
    CachedFetcher::new(config.cache.clone(), client, config.provider.lookback_days)
}

/// Snapshot to evaluate and the date to evaluate it on
fn load_or_fetch(
    config: &AppConfig,
    symbol: &str,
    today: Option<NaiveDate>,
    snapshot: Option<&PathBuf>,
    refresh: bool,
) -> VolResult<(MarketSnapshot, NaiveDate)> {
    if let Some(path) = snapshot {
        let snapshot = MarketSnapshot::load(path)?;
        let date = snapshot.evaluation_date(today);
        return Ok((snapshot, date));
    }

    let today = today.unwrap_or_else(local_today);
    let fetcher = fetcher(config)?;
    let snapshot = if refresh {
        fetcher.refresh_snapshot(symbol, today)?
    } else {
        fetcher.get_snapshot(symbol, today)?
    };
    Ok((snapshot, today))
}

fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Backdrop for a live screen; a failed fetch is logged and left out
fn live_macro_status(config: &AppConfig) -> Option<MacroStatus> {
    if !config.macro_context.enabled {
        return None;
    }
    let status = YahooClient::new(config.provider.clone())
        .and_then(|client| fetch_macro_status(&client, &config.macro_context));
    match status {
        Ok(status) => Some(status),
        Err(e) => {
            tracing::warn!("Macro backdrop unavailable: {}", e);
            None
        }
    }
}

fn run(cli: Cli) -> VolResult<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let engine = VolatilityEngine::from_config(&config);

    match cli.cmd {
        Cmd::Screen {
            symbol,
            snapshot,
            raw,
            refresh,
        } => {
            let symbol = symbol.to_uppercase();
            let offline = snapshot.is_some();
            let (snapshot, today) =
                load_or_fetch(&config, &symbol, cli.today, snapshot.as_ref(), refresh)?;
            let earnings = EarningsStore::open(&config.earnings.store_path)?;
            let mut report = engine
                .evaluate(&snapshot, today)?
                .with_next_earnings(earnings.next_for(&symbol, today).map(|e| e.date));
            if !offline {
                report = report.with_macro_status(live_macro_status(&config));
            }

            if raw {
                print_json(&report)?;
            } else {
                print_json(&report.summary())?;
            }
        }
        Cmd::Signal { symbol, snapshot } => {
            let symbol = symbol.to_uppercase();
            let (snapshot, today) =
                load_or_fetch(&config, &symbol, cli.today, snapshot.as_ref(), false)?;
            print_json(&engine.signal(&snapshot, today)?)?;
        }
        Cmd::Snapshot { symbol, out } => {
            let symbol = symbol.to_uppercase();
            let client = YahooClient::new(config.provider.clone())?;
            let today = cli.today.unwrap_or_else(local_today);
            let snapshot =
                MarketSnapshot::capture(&client, &symbol, today, config.provider.lookback_days)?;
            snapshot.save(&out)?;
        }
        Cmd::Cache { sub } => {
            let cache = DataCache::new(config.cache.clone())?;
            match sub {
                CacheCmd::List => print_json(&cache.list_cached()?)?,
                CacheCmd::Clear { symbol: Some(symbol) } => cache.clear(&symbol)?,
                CacheCmd::Clear { symbol: None } => {
                    cache.clear_all()?;
                }
            }
        }
        Cmd::Earnings { sub } => {
            let today = cli.today.unwrap_or_else(local_today);
            let mut store = EarningsStore::open(&config.earnings.store_path)?;
            match sub {
                EarningsCmd::Add {
                    symbol,
                    date,
                    timing,
                    eps_estimate,
                } => {
                    let mut event = EarningsEvent::new(symbol, date, timing.into());
                    event.eps_estimate = eps_estimate;
                    if store.upsert(event) {
                        store.save()?;
                    } else {
                        tracing::warn!("Event already recorded");
                    }
                }
                EarningsCmd::Import { file } => {
                    let json = fs::read_to_string(&file)?;
                    let events: Vec<EarningsEvent> = serde_json::from_str(&json)
                        .map_err(|e| VolError::Serialization(e.to_string()))?;
                    let added = store.record_all(events);
                    store.save()?;
                    print_json(&added)?;
                }
                EarningsCmd::List { days, symbol } => {
                    let events: Vec<&EarningsEvent> = match (symbol, days) {
                        (Some(symbol), None) => store.events_for(&symbol),
                        (Some(symbol), Some(days)) => store
                            .upcoming(today, days)
                            .into_iter()
                            .filter(|e| e.symbol.eq_ignore_ascii_case(&symbol))
                            .collect(),
                        (None, Some(days)) => store.upcoming(today, days),
                        (None, None) => store.upcoming(today, 365),
                    };
                    print_json(&events)?;
                }
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        // the instrument cannot be screened, as opposed to a broken setup
        Err(e) if e.is_data_quality() => {
            tracing::warn!("Not screenable: {}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
