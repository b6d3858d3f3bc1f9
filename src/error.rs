//! Error types for balance history computations.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Result type alias for balance history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Errors that can occur while loading or sampling account history.
#[derive(Error, Debug)]
pub enum HistoryError {
    /// Timeseries window ends before it starts
    #[error("Invalid date range: end {end} is before start {start}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Timeseries interval is zero or negative
    #[error("Invalid interval {0}: must be positive")]
    InvalidInterval(Duration),

    /// Failed to open or read the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid transaction record
    #[error("Invalid transaction at row {row}: {message}")]
    InvalidRecord { row: usize, message: String },

    /// A window bound had to be derived but the account has no confirmed history
    #[error("No confirmed transactions to derive the time window from")]
    NoConfirmedTransactions,

    /// Malformed command-line argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
