use std::collections::HashSet;
use tally_core::{Snapshot, TransactionId};

use crate::model::Match;

/// Ids consumed by accepted matches during one run.
#[derive(Debug, Clone, Default)]
pub struct ClaimSet {
    ids: HashSet<TransactionId>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything already settled before this run: transactions carrying a
    /// match id, ids named by earlier matches, and ids already sitting in some
    /// transaction's linked list.
    pub fn seeded(snapshot: &Snapshot, existing: &[Match]) -> Self {
        let mut claims = Self::new();
        for tx in snapshot.transactions() {
            if tx.is_matched() {
                claims.claim(&tx.id);
            }
            claims.claim_all(&tx.linked_ids);
        }
        for m in existing {
            claims.claim_match(m);
        }
        claims
    }

    pub fn claim(&mut self, id: &TransactionId) -> bool {
        self.ids.insert(id.clone())
    }

    pub fn claim_all<'a, I: IntoIterator<Item = &'a TransactionId>>(&mut self, ids: I) {
        for id in ids {
            self.claim(id);
        }
    }

    pub fn claim_match(&mut self, m: &Match) {
        self.claim(&m.primary_id);
        self.claim_all(&m.linked_ids);
    }

    pub fn contains(&self, id: &TransactionId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
