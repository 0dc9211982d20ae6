pub mod money;
pub mod period;
pub mod snapshot;
pub mod transaction;

pub use money::{Money, MAX_AMOUNT_UNITS};
pub use period::DateRange;
pub use snapshot::{Snapshot, SnapshotError};
pub use transaction::{
    Feed, SourceTag, Transaction, TransactionId, TransactionKind, TransactionRecord,
};
