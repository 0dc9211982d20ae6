use std::collections::HashMap;
use thiserror::Error;

use super::transaction::{Transaction, TransactionId, TransactionRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("Transaction id must not be empty")]
    EmptyId,
    #[error("Duplicate transaction id: {0}")]
    DuplicateId(String),
    #[error("Transaction {0} has no date")]
    MissingDate(String),
    #[error("Transaction {id} has an unparseable date: '{value}'")]
    InvalidDate { id: String, value: String },
    #[error("Transaction {id} amount {value} is out of range")]
    AmountOutOfRange { id: String, value: String },
}

/// A validated, read-only view of the transaction collection for one run.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    transactions: Vec<Transaction>,
    index: HashMap<TransactionId, usize>,
}

impl Snapshot {
    /// Validates every record. The first bad record aborts the whole snapshot.
    pub fn from_records(records: Vec<TransactionRecord>) -> Result<Self, SnapshotError> {
        let transactions = records
            .into_iter()
            .map(Transaction::validate)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(transactions)
    }

    pub fn new(transactions: Vec<Transaction>) -> Result<Self, SnapshotError> {
        let mut index = HashMap::with_capacity(transactions.len());
        for (pos, tx) in transactions.iter().enumerate() {
            if !tx.amount.is_within_limit() {
                return Err(SnapshotError::AmountOutOfRange {
                    id: tx.id.to_string(),
                    value: tx.amount.to_string(),
                });
            }
            if index.insert(tx.id.clone(), pos).is_some() {
                return Err(SnapshotError::DuplicateId(tx.id.to_string()));
            }
        }
        Ok(Snapshot { transactions, index })
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn get(&self, id: &TransactionId) -> Option<&Transaction> {
        self.index.get(id).map(|&pos| &self.transactions[pos])
    }

    /// Position of a transaction in snapshot order.
    pub fn position(&self, id: &TransactionId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }
}
