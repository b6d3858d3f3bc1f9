//! Balance History CLI
//!
//! Reads an account's transactions from CSV and prints the ordered ledger
//! with running balances, a confirmed/pending balance summary, or a sampled
//! balance timeseries.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- transactions txs.csv > ledger.csv
//! cargo run -- summary txs.csv
//! cargo run -- timeseries txs.csv --start 2020-09-09T13:00:00Z --interval 1d
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use balance_history::{AccountHistory, HistoryError, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process;

/// Account balance history from a CSV of transactions
#[derive(Parser)]
#[command(name = "balance-history")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print transactions most recent first with the balance after each
    Transactions {
        /// Input CSV (type,txid,amount,fee,timestamp,height)
        input: PathBuf,
    },

    /// Print the confirmed, pending and total balance
    Summary {
        /// Input CSV (type,txid,amount,fee,timestamp,height)
        input: PathBuf,
    },

    /// Print the confirmed balance sampled at a fixed interval
    Timeseries {
        /// Input CSV (type,txid,amount,fee,timestamp,height)
        input: PathBuf,

        /// First sample time (RFC 3339). Defaults to the earliest confirmed transaction
        #[arg(long)]
        start: Option<DateTime<Utc>>,

        /// Last sample time (RFC 3339). Defaults to the latest confirmed transaction
        #[arg(long)]
        end: Option<DateTime<Utc>>,

        /// Sampling interval, e.g. 30m, 6h, 1d, 1w
        #[arg(long, default_value = "1d", value_parser = parse_interval)]
        interval: Duration,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let stdout = io::stdout();
    let handle = stdout.lock();

    match cli.command {
        Commands::Transactions { input } => load(&input)?.write_transactions(handle),
        Commands::Summary { input } => load(&input)?.write_summary(handle),
        Commands::Timeseries {
            input,
            start,
            end,
            interval,
        } => {
            let history = load(&input)?;
            let start = start
                .or_else(|| history.earliest_time())
                .ok_or(HistoryError::NoConfirmedTransactions)?;
            let end = end
                .or_else(|| history.latest_time())
                .ok_or(HistoryError::NoConfirmedTransactions)?;
            history.write_timeseries(handle, start, end, interval)
        }
    }
}

fn load(path: &Path) -> Result<AccountHistory> {
    let file = File::open(path)?;
    AccountHistory::from_csv(BufReader::new(file))
}

/// Parses `<n><unit>` with unit `s`, `m`, `h`, `d` or `w`.
fn parse_interval(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let invalid = || HistoryError::InvalidArgument(format!("interval '{}'", raw));

    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (count, unit) = raw.split_at(split);
    let count: i64 = count.parse().map_err(|_| invalid())?;

    let seconds_per_unit = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        "w" => 7 * 24 * 60 * 60,
        _ => return Err(invalid()),
    };

    count
        .checked_mul(seconds_per_unit)
        .and_then(Duration::try_seconds)
        .ok_or_else(invalid)
}
