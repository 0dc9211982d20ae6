use tally_core::{Feed, TransactionId};
use thiserror::Error;

/// Reasons a manual match, an accepted suggestion, or an update plan is
/// refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("unknown transaction {0}")]
    UnknownTransaction(TransactionId),

    #[error("{0} is not a primary bank transaction")]
    NotPrimary(TransactionId),

    #[error("{id} comes from the {found} feed, expected {expected}")]
    WrongFeed {
        id: TransactionId,
        expected: Feed,
        found: Feed,
    },

    #[error("{0} is already claimed by another match")]
    AlreadyClaimed(TransactionId),

    #[error("a match needs at least one linked transaction")]
    NoLinkedTransactions,

    #[error("{0} was not offered as a candidate")]
    NotACandidate(TransactionId),

    #[error("{id} has the wrong sign for this match")]
    SignMismatch { id: TransactionId },

    #[error("{0} links more than one record and cannot be combined")]
    CombinationNotAllowed(TransactionId),
}
