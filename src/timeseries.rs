//! Timeseries sampler.
//!
//! Turns a most-recent-first ordered ledger into a fixed-cadence balance
//! series using forward fill. Only confirmed transactions are placed on the
//! grid; pending ones have no point in calendar time.

use crate::amount::Amount;
use crate::error::{HistoryError, Result};
use crate::ordering::OrderedTransaction;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::Serialize;

/// Balance in effect at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeseriesEntry {
    pub time: DateTime<Utc>,
    pub value: Amount,
}

/// Bucket times from `start` to `end`, both inclusive.
///
/// Steps by `interval` while short of `end`; the last step lands exactly on
/// `end` even when it is shorter than `interval`. Callers validate that
/// `interval` is positive and `start <= end`.
fn grid(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval: Duration,
) -> impl Iterator<Item = DateTime<Utc>> {
    let mut next = Some(start);
    std::iter::from_fn(move || {
        let current = next?;
        next = if current >= end {
            None
        } else {
            Some(
                current
                    .checked_add_signed(interval)
                    .map_or(end, |t| t.min(end)),
            )
        };
        Some(current)
    })
}

/// Samples the confirmed balance of `ordered` from `start` to `end` every
/// `interval`.
///
/// `ordered` must be most recent first, as produced by
/// [`crate::ordering::order`]; it is not re-sorted. Each bucket takes the
/// balance of the latest confirmed transaction at or before the bucket time,
/// or zero if there is none yet.
///
/// # Errors
///
/// - [`HistoryError::InvalidInterval`] if `interval` is not positive
/// - [`HistoryError::InvalidRange`] if `end` is before `start`
pub fn sample(
    ordered: &[OrderedTransaction],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval: Duration,
) -> Result<Vec<TimeseriesEntry>> {
    if interval <= Duration::zero() {
        return Err(HistoryError::InvalidInterval(interval));
    }
    if end < start {
        return Err(HistoryError::InvalidRange { start, end });
    }

    // Oldest first, so the cursor only moves forward as bucket time grows.
    let confirmed: Vec<(DateTime<Utc>, Amount)> = ordered
        .iter()
        .rev()
        .filter_map(|o| o.timestamp.map(|time| (time, o.balance)))
        .collect();

    let mut cursor = 0;
    let mut value = Amount::ZERO;
    let entries: Vec<TimeseriesEntry> = grid(start, end, interval)
        .map(|time| {
            while let Some(&(tx_time, balance)) = confirmed.get(cursor) {
                if tx_time > time {
                    break;
                }
                value = balance;
                cursor += 1;
            }
            TimeseriesEntry { time, value }
        })
        .collect();

    debug!(
        "Sampled {} buckets from {} to {} over {} confirmed transactions",
        entries.len(),
        start,
        end,
        confirmed.len()
    );

    Ok(entries)
}
