//! # Balance History
//!
//! Orders an account's transactions, reconstructs the balance after each of
//! them and samples the confirmed balance over time.
//!
//! ## Design Principles
//!
//! - **Exact arithmetic**: Amounts are `rust_decimal` values, never floats
//! - **Pending first**: Transactions without a confirmation time are newer
//!   than every confirmed one
//! - **Backward balances**: Running balances are derived from the total, so
//!   no opening balance is needed
//! - **Deterministic output**: Ties are broken by height, then input order
//!
//! ## Example
//!
//! ```
//! use balance_history::{order, Amount, TransactionData, TxKind};
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let day = |d| Utc.with_ymd_and_hms(2020, 9, d, 12, 0, 0).unwrap();
//! let txs = vec![
//!     TransactionData::new(TxKind::Receive, Amount::from_i64(200)).confirmed_at(day(10), 10),
//!     TransactionData::new(TxKind::Send, Amount::from_i64(10)).confirmed_at(day(11), 11),
//!     TransactionData::new(TxKind::Send, Amount::from_i64(20)),
//! ];
//!
//! let ordered = order(&txs);
//! assert_eq!(ordered.total(), Amount::from_i64(170));
//!
//! let series = ordered.timeseries(day(9), day(11), Duration::days(1)).unwrap();
//! let values: Vec<Amount> = series.iter().map(|e| e.value).collect();
//! assert_eq!(values, vec![Amount::ZERO, Amount::from_i64(200), Amount::from_i64(190)]);
//! ```

pub mod amount;
pub mod error;
pub mod ledger;
pub mod ordering;
pub mod timeseries;
pub mod transaction;

pub use amount::Amount;
pub use error::{HistoryError, Result};
pub use ledger::{read_transactions, AccountHistory};
pub use ordering::{order, recency, Balance, OrderedTransaction, OrderedTransactions};
pub use timeseries::{sample, TimeseriesEntry};
pub use transaction::{TransactionData, TransactionRecord, TxKind};
