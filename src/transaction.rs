//! Transaction models for CSV parsing and the engine's input records.

use crate::amount::Amount;
use crate::error::{HistoryError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a transaction relative to the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    /// Funds received from someone else.
    Receive,

    /// Funds sent to someone else.
    Send,

    /// Funds sent to an address owned by the same account. Only the fee leaves.
    SendToSelf,
}

impl TxKind {
    /// Canonical lowercase name, as read and written in CSV.
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Receive => "receive",
            TxKind::Send => "send",
            TxKind::SendToSelf => "send_to_self",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "receive" => Ok(TxKind::Receive),
            "send" => Ok(TxKind::Send),
            "send_to_self" | "sendtoself" | "send-to-self" | "send_self" => {
                Ok(TxKind::SendToSelf)
            }
            other => Err(format!("unknown transaction type '{}'", other)),
        }
    }
}

/// A transaction as supplied by the wallet, in no particular order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionData {
    /// Identifier for display. May be empty.
    pub txid: String,

    pub kind: TxKind,

    /// Amount moved. For `SendToSelf` it has no effect on the balance.
    pub amount: Amount,

    /// Network fee. Only used for `SendToSelf`; a missing fee counts as zero.
    pub fee: Option<Amount>,

    /// Confirmation time. `None` means the transaction is still pending.
    pub timestamp: Option<DateTime<Utc>>,

    /// Confirmation height, 0 while unconfirmed.
    pub height: u64,
}

impl TransactionData {
    /// Creates a record with no txid, fee, timestamp or height.
    pub fn new(kind: TxKind, amount: Amount) -> Self {
        TransactionData {
            txid: String::new(),
            kind,
            amount,
            fee: None,
            timestamp: None,
            height: 0,
        }
    }

    /// Sets the txid.
    pub fn with_txid(mut self, txid: impl Into<String>) -> Self {
        self.txid = txid.into();
        self
    }

    /// Sets the fee.
    pub fn with_fee(mut self, fee: Amount) -> Self {
        self.fee = Some(fee);
        self
    }

    /// Marks the record as confirmed at `timestamp` and `height`.
    pub fn confirmed_at(mut self, timestamp: DateTime<Utc>, height: u64) -> Self {
        self.timestamp = Some(timestamp);
        self.height = height;
        self
    }

    /// Returns `true` if the record has a confirmation timestamp.
    pub fn is_confirmed(&self) -> bool {
        self.timestamp.is_some()
    }

    /// Net change this transaction made to the account balance.
    ///
    /// A `SendToSelf` without a fee is accepted and contributes zero.
    pub fn effect(&self) -> Amount {
        match self.kind {
            TxKind::Receive => self.amount,
            TxKind::Send => -self.amount,
            TxKind::SendToSelf => -self.fee.unwrap_or(Amount::ZERO),
        }
    }
}

/// Raw transaction record as read from CSV.
///
/// Every column except `type` may be empty. Values are kept as strings so a
/// bad row can be reported with its row number instead of aborting the read.
#[derive(Debug, Deserialize)]
pub struct TransactionRecord {
    /// Transaction type: receive, send, send_to_self
    #[serde(rename = "type")]
    pub tx_type: String,

    #[serde(default)]
    pub txid: Option<String>,

    #[serde(default)]
    pub amount: Option<String>,

    #[serde(default)]
    pub fee: Option<String>,

    /// RFC 3339 confirmation time, empty when pending
    #[serde(default)]
    pub timestamp: Option<String>,

    #[serde(default)]
    pub height: Option<String>,
}

impl TransactionRecord {
    /// Parses the raw CSV record into a typed transaction.
    ///
    /// `row` is only used in the error message.
    pub fn parse(&self, row: usize) -> Result<TransactionData> {
        let invalid = |message: String| HistoryError::InvalidRecord { row, message };

        let kind = TxKind::from_str(&self.tx_type).map_err(invalid)?;

        let amount = match non_empty(&self.amount) {
            Some(raw) => parse_amount("amount", raw).map_err(invalid)?,
            None => return Err(invalid("missing amount".to_string())),
        };

        let fee = non_empty(&self.fee)
            .map(|raw| parse_amount("fee", raw).map_err(invalid))
            .transpose()?;

        let timestamp = non_empty(&self.timestamp)
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| invalid(format!("invalid timestamp '{}': {}", raw, e)))
            })
            .transpose()?;

        let height = match non_empty(&self.height) {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| invalid(format!("invalid height '{}': {}", raw, e)))?,
            None => 0,
        };

        Ok(TransactionData {
            txid: non_empty(&self.txid).unwrap_or_default().to_string(),
            kind,
            amount,
            fee,
            timestamp,
            height,
        })
    }
}

/// Parses a monetary field, rejecting magnitudes above [`Amount::MAX_UNITS`].
fn parse_amount(field: &str, raw: &str) -> std::result::Result<Amount, String> {
    let amount =
        Amount::from_str(raw).map_err(|e| format!("invalid {} '{}': {}", field, raw, e))?;
    if amount.exceeds_max() {
        return Err(format!("{} '{}' is out of range", field, raw));
    }
    Ok(amount)
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(
        tx_type: &str,
        amount: &str,
        fee: &str,
        timestamp: &str,
        height: &str,
    ) -> TransactionRecord {
        TransactionRecord {
            tx_type: tx_type.to_string(),
            txid: Some("abc".to_string()),
            amount: Some(amount.to_string()),
            fee: Some(fee.to_string()),
            timestamp: Some(timestamp.to_string()),
            height: Some(height.to_string()),
        }
    }

    #[test]
    fn test_parse_confirmed_receive() {
        let parsed = record("receive", "1.5", "", "2020-09-15T12:00:00Z", "15")
            .parse(2)
            .unwrap();

        assert_eq!(parsed.txid, "abc");
        assert_eq!(parsed.kind, TxKind::Receive);
        assert_eq!(parsed.amount.to_string(), "1.5");
        assert_eq!(parsed.fee, None);
        assert_eq!(
            parsed.timestamp,
            Some(Utc.with_ymd_and_hms(2020, 9, 15, 12, 0, 0).unwrap())
        );
        assert_eq!(parsed.height, 15);
    }

    #[test]
    fn test_parse_pending_send() {
        let parsed = record("send", "20", "", "", "").parse(2).unwrap();
        assert_eq!(parsed.kind, TxKind::Send);
        assert!(!parsed.is_confirmed());
        assert_eq!(parsed.height, 0);
    }

    #[test]
    fn test_parse_converts_offset_to_utc() {
        let parsed = record("receive", "1", "", "2020-09-15T14:00:00+02:00", "1")
            .parse(2)
            .unwrap();
        assert_eq!(
            parsed.timestamp,
            Some(Utc.with_ymd_and_hms(2020, 9, 15, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_send_to_self_aliases() {
        for name in ["send_to_self", "SendToSelf", " send-to-self ", "send_self"] {
            let parsed = record(name, "50", "1", "", "").parse(2).unwrap();
            assert_eq!(parsed.kind, TxKind::SendToSelf);
            assert_eq!(parsed.fee, Some(Amount::from_i64(1)));
        }
    }

    #[test]
    fn test_parse_rejects_bad_fields() {
        let cases = [
            record("transfer", "1", "", "", ""),
            record("receive", "x", "", "", ""),
            record("receive", "", "", "", ""),
            record("send_to_self", "1", "y", "", ""),
            record("receive", "1", "", "yesterday", ""),
            record("receive", "1", "", "", "-3"),
        ];

        for case in cases {
            match case.parse(7) {
                Err(HistoryError::InvalidRecord { row, .. }) => assert_eq!(row, 7),
                other => panic!("Expected InvalidRecord, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_parse_rejects_out_of_range_amounts() {
        let cases = [
            record("receive", "79228162514264337593543950335", "", "", ""),
            record("send", "-1000000000000000001", "", "", ""),
            record("send_to_self", "1", "1000000000000000000.5", "", ""),
        ];

        for case in cases {
            match case.parse(3) {
                Err(HistoryError::InvalidRecord { row, message }) => {
                    assert_eq!(row, 3);
                    assert!(message.contains("out of range"), "{}", message);
                }
                other => panic!("Expected InvalidRecord, got {:?}", other),
            }
        }

        let at_limit = record("receive", "1000000000000000000", "", "", "")
            .parse(3)
            .unwrap();
        assert_eq!(at_limit.amount, Amount::from_i64(Amount::MAX_UNITS));
    }

    #[test]
    fn test_effect_by_kind() {
        let receive = TransactionData::new(TxKind::Receive, Amount::from_i64(100));
        let send = TransactionData::new(TxKind::Send, Amount::from_i64(20));
        let to_self = TransactionData::new(TxKind::SendToSelf, Amount::from_i64(50))
            .with_fee(Amount::from_i64(1));

        assert_eq!(receive.effect(), Amount::from_i64(100));
        assert_eq!(send.effect(), Amount::from_i64(-20));
        assert_eq!(to_self.effect(), Amount::from_i64(-1));
    }

    #[test]
    fn test_send_to_self_without_fee_has_no_effect() {
        let to_self = TransactionData::new(TxKind::SendToSelf, Amount::from_i64(50));
        assert_eq!(to_self.effect(), Amount::ZERO);
    }

    #[test]
    fn test_kind_display_round_trips_through_from_str() {
        for kind in [TxKind::Receive, TxKind::Send, TxKind::SendToSelf] {
            assert_eq!(TxKind::from_str(&kind.to_string()), Ok(kind));
        }
    }
}
