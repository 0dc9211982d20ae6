use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Money;
use super::snapshot::SnapshotError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        TransactionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(s: &str) -> Self {
        TransactionId(s.to_string())
    }
}

/// The feed a transaction was imported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    /// The primary bank account everything is reconciled against.
    Bank,
    /// Payment-processor export (PayPal, Stripe, ...).
    Processor,
    /// Credit-card statement lines.
    Card,
    /// Second bank account that only exchanges internal transfers.
    Transfer,
    /// E-commerce order history. Context only, never a bank movement.
    OrderHistory,
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feed::Bank => write!(f, "bank"),
            Feed::Processor => write!(f, "processor"),
            Feed::Card => write!(f, "card"),
            Feed::Transfer => write!(f, "transfer"),
            Feed::OrderHistory => write!(f, "order_history"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTag {
    pub feed: Feed,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    #[default]
    Regular,
    /// Money moved between the user's own accounts.
    Internal,
}

/// A transaction as handed over by an import adapter, before its date has
/// been checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    #[serde(default)]
    pub date: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub beneficiary: Option<String>,
    #[serde(default)]
    pub source: Option<SourceTag>,
    #[serde(default)]
    pub match_id: Option<String>,
    #[serde(default)]
    pub context_only: bool,
    #[serde(default)]
    pub linked_ids: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub kind: TransactionKind,
    #[serde(default)]
    pub exclude_from_stats: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub date: NaiveDate,
    pub amount: Money,
    pub description: String,
    pub beneficiary: Option<String>,
    pub source: Option<SourceTag>,
    pub match_id: Option<String>,
    pub context_only: bool,
    pub linked_ids: Vec<TransactionId>,
    pub category: Option<String>,
    pub kind: TransactionKind,
    pub exclude_from_stats: bool,
}

impl Transaction {
    /// Checks the record's id and date. Dates may be `YYYY-MM-DD` or an
    /// RFC 3339 timestamp, which is truncated to its calendar day.
    pub fn validate(record: TransactionRecord) -> Result<Transaction, SnapshotError> {
        let id = record.id.trim();
        if id.is_empty() {
            return Err(SnapshotError::EmptyId);
        }

        let raw_date = record
            .date
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| SnapshotError::MissingDate(id.to_string()))?;
        let date = parse_date(raw_date).ok_or_else(|| SnapshotError::InvalidDate {
            id: id.to_string(),
            value: raw_date.to_string(),
        })?;
        let amount = Money::from_decimal(record.amount);
        if !amount.is_within_limit() {
            return Err(SnapshotError::AmountOutOfRange {
                id: id.to_string(),
                value: record.amount.to_string(),
            });
        }

        Ok(Transaction {
            id: TransactionId::new(id),
            date,
            amount,
            description: record.description,
            beneficiary: record.beneficiary,
            source: record.source,
            match_id: record.match_id,
            context_only: record.context_only,
            linked_ids: record.linked_ids.into_iter().map(TransactionId).collect(),
            category: record.category,
            kind: record.kind,
            exclude_from_stats: record.exclude_from_stats,
        })
    }

    /// Missing source tags default to the primary bank feed.
    pub fn feed(&self) -> Feed {
        self.source.as_ref().map_or(Feed::Bank, |s| s.feed)
    }

    pub fn is_primary(&self) -> bool {
        self.feed() == Feed::Bank && !self.context_only
    }

    pub fn is_matched(&self) -> bool {
        self.match_id.is_some()
    }

    /// Description and beneficiary joined for pattern tests.
    pub fn search_text(&self) -> String {
        match &self.beneficiary {
            Some(b) if !b.is_empty() => format!("{} {}", self.description, b),
            _ => self.description.clone(),
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}
