//! CSV ingestion and reporting around the ordering engine and sampler.
//!
//! Reads transaction records in streaming fashion, skips rows that fail to
//! parse, and writes the ordered ledger, balance summary or timeseries back
//! out as CSV.

use crate::error::Result;
use crate::ordering::{Balance, OrderedTransactions};
use crate::timeseries::TimeseriesEntry;
use crate::transaction::{TransactionData, TransactionRecord};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use csv::{ReaderBuilder, Trim};
use log::{debug, warn};
use std::io::{Read, Write};

/// The ordered transaction history of a single account.
///
/// Built once from an unordered set of transactions; every report is derived
/// from the same ordering so balances and timeseries always agree.
#[derive(Debug, Clone, Default)]
pub struct AccountHistory {
    ordered: OrderedTransactions,
}

impl AccountHistory {
    /// Orders an in-memory set of transactions.
    pub fn from_transactions(txs: &[TransactionData]) -> Self {
        AccountHistory {
            ordered: OrderedTransactions::new(txs),
        }
    }

    /// Reads transactions from a CSV reader and orders them.
    ///
    /// Records are read one at a time. Invalid records are logged at warn
    /// level and skipped.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let txs = read_transactions(reader)?;
        Ok(Self::from_transactions(&txs))
    }

    /// The ordered ledger, most recent first.
    pub fn transactions(&self) -> &OrderedTransactions {
        &self.ordered
    }

    pub fn balance(&self) -> Balance {
        self.ordered.balance()
    }

    pub fn earliest_time(&self) -> Option<DateTime<Utc>> {
        self.ordered.earliest_time()
    }

    pub fn latest_time(&self) -> Option<DateTime<Utc>> {
        self.ordered.latest_time()
    }

    /// Samples the confirmed balance. See [`crate::timeseries::sample`].
    pub fn timeseries(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Duration,
    ) -> Result<Vec<TimeseriesEntry>> {
        self.ordered.timeseries(start, end, interval)
    }

    /// Writes the ordered ledger with running balances to CSV.
    ///
    /// Pending transactions have an empty timestamp. Amounts are written
    /// without trailing zeros.
    pub fn write_transactions<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "txid",
            "type",
            "amount",
            "fee",
            "timestamp",
            "height",
            "balance",
        ])?;

        for entry in &self.ordered {
            csv_writer.write_record([
                entry.txid.clone(),
                entry.kind.to_string(),
                entry.amount.to_string(),
                entry.fee.map(|fee| fee.to_string()).unwrap_or_default(),
                entry.timestamp.map(format_time).unwrap_or_default(),
                entry.height.to_string(),
                entry.balance.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Writes the confirmed, pending and total balance as a single CSV row.
    pub fn write_summary<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        let balance = self.balance();

        csv_writer.write_record(["confirmed", "pending", "total"])?;
        csv_writer.write_record([
            balance.confirmed.to_string(),
            balance.pending.to_string(),
            balance.total.to_string(),
        ])?;

        csv_writer.flush()?;
        Ok(())
    }

    /// Samples the confirmed balance and writes one `time,value` row per bucket.
    pub fn write_timeseries<W: Write>(
        &self,
        writer: W,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Duration,
    ) -> Result<()> {
        let entries = self.timeseries(start, end, interval)?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["time", "value"])?;
        for entry in entries {
            csv_writer.write_record([format_time(entry.time), entry.value.to_string()])?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

/// Reads transaction records from CSV, skipping rows that fail to parse.
pub fn read_transactions<R: Read>(reader: R) -> Result<Vec<TransactionData>> {
    let mut csv_reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut txs = Vec::new();
    for (row_idx, result) in csv_reader.deserialize::<TransactionRecord>().enumerate() {
        let row_num = row_idx + 2; // 1-indexed, accounting for header row

        match result {
            Ok(record) => match record.parse(row_num) {
                Ok(tx) => txs.push(tx),
                Err(e) => warn!("{}", e),
            },
            Err(e) => {
                warn!("Row {}: CSV parse error: {}", row_num, e);
            }
        }
    }

    debug!("Read {} transactions", txs.len());
    Ok(txs)
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
