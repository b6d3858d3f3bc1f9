//! Ordering & balance engine.
//!
//! Puts an unordered set of transactions into a strict most-recent-first
//! order and reconstructs the account balance right after each of them.
//!
//! Balances are computed backwards from the total implied by the whole set:
//! the most recent transaction carries the total, and every older one carries
//! the balance of its successor minus the successor's effect. No opening
//! balance is needed.

use crate::amount::Amount;
use crate::error::Result;
use crate::timeseries::{self, TimeseriesEntry};
use crate::transaction::{TransactionData, TxKind};
use chrono::{DateTime, Duration, Utc};
use log::debug;
use std::cmp::Ordering;
use std::ops::Deref;

/// Where a transaction sits in history.
///
/// Variant order matters: every `Pending` transaction is more recent than
/// any `Confirmed` one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Position {
    Confirmed(DateTime<Utc>),
    Pending,
}

impl Position {
    fn of(tx: &TransactionData) -> Self {
        match tx.timestamp {
            Some(time) => Position::Confirmed(time),
            None => Position::Pending,
        }
    }
}

/// Compares two transactions, most recent first.
///
/// Pending before confirmed, then newer timestamp first, then higher
/// confirmation height first. Equal keys compare `Equal` so a stable sort
/// keeps their input order.
pub fn recency(a: &TransactionData, b: &TransactionData) -> Ordering {
    (Position::of(b), b.height).cmp(&(Position::of(a), a.height))
}

/// A transaction together with the balance right after it was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedTransaction {
    pub tx: TransactionData,

    /// Balance after this transaction, before any more recent one.
    pub balance: Amount,
}

impl Deref for OrderedTransaction {
    type Target = TransactionData;

    fn deref(&self) -> &Self::Target {
        &self.tx
    }
}

/// Confirmed, pending and total balance of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Balance {
    /// Balance counting only confirmed transactions.
    pub confirmed: Amount,

    /// Net effect of all pending transactions.
    pub pending: Amount,

    /// `confirmed + pending`.
    pub total: Amount,
}

/// Transactions sorted most recent first, each with its running balance.
///
/// # Invariants
///
/// - `self[0].balance` equals the sum of all effects
/// - for adjacent `a`, `b`: `a.balance - a.effect() == b.balance`
/// - pending transactions precede all confirmed ones
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderedTransactions(Vec<OrderedTransaction>);

impl OrderedTransactions {
    /// Orders `txs` and computes the balance after each one.
    ///
    /// Sums saturate at the `Decimal` bounds, so amounts far beyond
    /// [`Amount::MAX_UNITS`] clamp the balances instead of panicking.
    pub fn new(txs: &[TransactionData]) -> Self {
        let mut sorted: Vec<TransactionData> = txs.to_vec();
        sorted.sort_by(recency);

        let total = sorted
            .iter()
            .map(TransactionData::effect)
            .fold(Amount::ZERO, Amount::saturating_add);

        let mut balance = total;
        let ordered: Vec<OrderedTransaction> = sorted
            .into_iter()
            .map(|tx| {
                if tx.kind == TxKind::SendToSelf && tx.fee.is_none() {
                    debug!("Self transfer '{}' has no fee, counting it as zero", tx.txid);
                }
                let entry_balance = balance;
                balance = balance.saturating_sub(tx.effect());
                OrderedTransaction {
                    tx,
                    balance: entry_balance,
                }
            })
            .collect();

        debug!(
            "Ordered {} transactions ({} pending), total balance {}",
            ordered.len(),
            ordered.iter().filter(|o| !o.is_confirmed()).count(),
            total
        );

        OrderedTransactions(ordered)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OrderedTransaction> {
        self.0.iter()
    }

    /// Current balance including pending transactions. Zero when empty.
    pub fn total(&self) -> Amount {
        self.0.first().map(|o| o.balance).unwrap_or(Amount::ZERO)
    }

    /// Splits the current balance into its confirmed and pending parts.
    pub fn balance(&self) -> Balance {
        let total = self.total();
        let confirmed = self
            .confirmed()
            .next()
            .map(|o| o.balance)
            .unwrap_or(Amount::ZERO);

        Balance {
            confirmed,
            pending: total - confirmed,
            total,
        }
    }

    /// Timestamp of the oldest confirmed transaction.
    pub fn earliest_time(&self) -> Option<DateTime<Utc>> {
        self.confirmed().next_back().and_then(|o| o.timestamp)
    }

    /// Timestamp of the newest confirmed transaction.
    pub fn latest_time(&self) -> Option<DateTime<Utc>> {
        self.confirmed().next().and_then(|o| o.timestamp)
    }

    /// Samples the confirmed balance from `start` to `end` every `interval`.
    ///
    /// See [`timeseries::sample`].
    pub fn timeseries(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Duration,
    ) -> Result<Vec<TimeseriesEntry>> {
        timeseries::sample(&self.0, start, end, interval)
    }

    /// Confirmed transactions, most recent first.
    fn confirmed(&self) -> impl DoubleEndedIterator<Item = &OrderedTransaction> {
        self.0.iter().filter(|o| o.is_confirmed())
    }
}

impl Deref for OrderedTransactions {
    type Target = [OrderedTransaction];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl IntoIterator for OrderedTransactions {
    type Item = OrderedTransaction;
    type IntoIter = std::vec::IntoIter<OrderedTransaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a OrderedTransactions {
    type Item = &'a OrderedTransaction;
    type IntoIter = std::slice::Iter<'a, OrderedTransaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Orders `records` most recent first and attaches running balances.
///
/// Never fails or panics. Inconsistent input (e.g. negative amounts) still
/// yields balances that satisfy the ordering invariants.
pub fn order(records: &[TransactionData]) -> OrderedTransactions {
    OrderedTransactions::new(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn at(day: u32, height: u64) -> (DateTime<Utc>, u64) {
        (Utc.with_ymd_and_hms(2020, 9, day, 12, 0, 0).unwrap(), height)
    }

    fn receive(amount: i64) -> TransactionData {
        TransactionData::new(TxKind::Receive, Amount::from_i64(amount))
    }

    fn send(amount: i64) -> TransactionData {
        TransactionData::new(TxKind::Send, Amount::from_i64(amount))
    }

    fn confirmed(tx: TransactionData, (time, height): (DateTime<Utc>, u64)) -> TransactionData {
        tx.confirmed_at(time, height)
    }

    fn balances(ordered: &OrderedTransactions) -> Vec<Amount> {
        ordered.iter().map(|o| o.balance).collect()
    }

    fn ids(ordered: &OrderedTransactions) -> Vec<&str> {
        ordered.iter().map(|o| o.txid.as_str()).collect()
    }

    #[test]
    fn test_empty_input() {
        let ordered = order(&[]);
        assert!(ordered.is_empty());
        assert_eq!(ordered.total(), Amount::ZERO);
        assert_eq!(ordered.balance(), Balance::default());
        assert_eq!(ordered.earliest_time(), None);
        assert_eq!(ordered.latest_time(), None);
    }

    #[test]
    fn test_orders_newest_first_with_backward_balances() {
        let txs = vec![
            confirmed(receive(100).with_txid("b"), at(15, 15)),
            confirmed(receive(200).with_txid("a"), at(10, 10)),
            confirmed(send(50).with_txid("c"), at(20, 20)),
        ];

        let ordered = order(&txs);
        assert_eq!(ids(&ordered), vec!["c", "b", "a"]);
        assert_eq!(
            balances(&ordered),
            vec![Amount::from_i64(250), Amount::from_i64(300), Amount::from_i64(200)]
        );
    }

    #[test]
    fn test_pending_sorts_before_confirmed_regardless_of_height() {
        let txs = vec![
            confirmed(receive(10).with_txid("confirmed"), at(30, 1_000_000)),
            send(1).with_txid("pending"),
        ];

        let ordered = order(&txs);
        assert_eq!(ids(&ordered), vec!["pending", "confirmed"]);
        assert_eq!(ordered[0].balance, Amount::from_i64(9));
        assert_eq!(ordered[1].balance, Amount::from_i64(10));
    }

    #[test]
    fn test_timestamp_tie_broken_by_height() {
        let txs = vec![
            confirmed(receive(1).with_txid("low"), at(10, 5)),
            confirmed(receive(2).with_txid("high"), at(10, 6)),
        ];

        let ordered = order(&txs);
        assert_eq!(ids(&ordered), vec!["high", "low"]);
    }

    #[test]
    fn test_full_tie_keeps_input_order() {
        let txs = vec![
            send(1).with_txid("first"),
            send(2).with_txid("second"),
            receive(3).with_txid("third"),
        ];

        let ordered = order(&txs);
        assert_eq!(ids(&ordered), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_all_pending_balances() {
        let txs = vec![receive(100), send(30), receive(5)];

        let ordered = order(&txs);
        assert_eq!(
            balances(&ordered),
            vec![Amount::from_i64(75), Amount::from_i64(-25), Amount::from_i64(5)]
        );
        let balance = ordered.balance();
        assert_eq!(balance.confirmed, Amount::ZERO);
        assert_eq!(balance.pending, Amount::from_i64(75));
        assert_eq!(balance.total, Amount::from_i64(75));
    }

    #[test]
    fn test_balance_splits_confirmed_and_pending() {
        let txs = vec![
            confirmed(receive(100), at(1, 1)),
            send(30),
            receive(5),
            confirmed(send(10), at(2, 2)),
        ];

        let balance = order(&txs).balance();
        assert_eq!(balance.confirmed, Amount::from_i64(90));
        assert_eq!(balance.pending, Amount::from_i64(-25));
        assert_eq!(balance.total, Amount::from_i64(65));
    }

    #[test]
    fn test_earliest_and_latest_time_skip_pending() {
        let txs = vec![
            send(1),
            confirmed(receive(5), at(12, 12)),
            confirmed(receive(5), at(3, 3)),
            confirmed(receive(5), at(8, 8)),
        ];

        let ordered = order(&txs);
        assert_eq!(ordered.earliest_time(), Some(at(3, 3).0));
        assert_eq!(ordered.latest_time(), Some(at(12, 12).0));
    }

    #[test]
    fn test_send_to_self_only_fee_counts() {
        let txs = vec![
            confirmed(receive(100), at(1, 1)),
            confirmed(
                TransactionData::new(TxKind::SendToSelf, Amount::from_i64(60))
                    .with_fee(Amount::from_i64(2)),
                at(2, 2),
            ),
            confirmed(
                TransactionData::new(TxKind::SendToSelf, Amount::from_i64(60)),
                at(3, 3),
            ),
        ];

        let ordered = order(&txs);
        assert_eq!(
            balances(&ordered),
            vec![Amount::from_i64(98), Amount::from_i64(98), Amount::from_i64(100)]
        );
        assert_eq!(ordered[1].amount, Amount::from_i64(60));
    }

    #[test]
    fn test_near_maximum_amounts_do_not_panic() {
        let max = Amount::from_str("79228162514264337593543950335").unwrap();
        let txs = vec![
            confirmed(TransactionData::new(TxKind::Receive, max), at(1, 1)),
            confirmed(receive(1), at(2, 2)),
            send(3),
        ];

        let ordered = order(&txs);
        assert_eq!(ordered.len(), 3);
        assert_eq!(ordered.total(), max - Amount::from_i64(2));
    }

    #[test]
    fn test_input_is_not_modified() {
        let txs = vec![confirmed(receive(1), at(1, 1)), confirmed(receive(2), at(2, 2))];
        let before = txs.clone();
        let _ = order(&txs);
        assert_eq!(txs, before);
    }

    #[test]
    fn test_order_is_independent_of_input_permutation() {
        let a = confirmed(receive(7).with_txid("a"), at(4, 4));
        let b = confirmed(send(3).with_txid("b"), at(9, 9));
        let c = receive(1).with_txid("c");

        let first = order(&[a.clone(), b.clone(), c.clone()]);
        let second = order(&[c, b, a]);
        assert_eq!(first, second);
    }
}
