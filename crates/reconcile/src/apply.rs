//! Match application: accepted matches become per-transaction deltas.
//!
//! Planning reads the snapshot and never mutates it. The caller owns the
//! collection and decides when to write deltas back.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tally_core::{Snapshot, Transaction, TransactionId, TransactionKind};

use crate::error::MatchError;
use crate::model::Match;

/// New values for the linkage fields of one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionUpdate {
    pub id: TransactionId,
    pub match_id: Option<String>,
    pub linked_ids: Vec<TransactionId>,
    pub kind: TransactionKind,
    pub exclude_from_stats: bool,
}

/// Deltas for `matches`, primary first, then its linked records.
///
/// Two-sided patterns stamp the match id on both sides and cross-link them.
/// Links a transaction already carries are kept. Order-history matches only
/// touch the bank transaction. Internal matches turn every side into an
/// internal transfer excluded from statistics.
pub fn plan_updates(
    snapshot: &Snapshot,
    matches: &[Match],
) -> Result<Vec<TransactionUpdate>, MatchError> {
    let mut touched: HashSet<&TransactionId> = HashSet::new();
    let mut updates = Vec::new();

    for m in matches {
        let primary = lookup(snapshot, &m.primary_id)?;
        check_free(primary, m, &mut touched)?;
        updates.push(update_for(primary, m, &m.linked_ids));

        if m.pattern.is_one_sided() {
            for id in &m.linked_ids {
                lookup(snapshot, id)?;
                if !touched.insert(id) {
                    return Err(MatchError::AlreadyClaimed(id.clone()));
                }
            }
            continue;
        }

        for id in &m.linked_ids {
            let linked = lookup(snapshot, id)?;
            check_free(linked, m, &mut touched)?;
            updates.push(update_for(linked, m, std::slice::from_ref(&m.primary_id)));
        }
    }

    tracing::debug!("planned {} updates for {} matches", updates.len(), matches.len());
    Ok(updates)
}

/// Deltas that undo `m`: its match id and its own links are removed. Kind
/// and the statistics flag are reset only when `m` set them, i.e. for
/// internal transfers.
pub fn unlink_updates(
    snapshot: &Snapshot,
    m: &Match,
) -> Result<Vec<TransactionUpdate>, MatchError> {
    let primary = lookup(snapshot, &m.primary_id)?;
    let mut updates = vec![undo_for(primary, m, &m.linked_ids)];
    if !m.pattern.is_one_sided() {
        for id in &m.linked_ids {
            let linked = lookup(snapshot, id)?;
            updates.push(undo_for(linked, m, std::slice::from_ref(&m.primary_id)));
        }
    }
    Ok(updates)
}

/// Writes `updates` into `transactions`. Every id is checked before anything
/// changes. Returns the number of transactions updated.
pub fn apply_updates(
    transactions: &mut [Transaction],
    updates: &[TransactionUpdate],
) -> Result<usize, MatchError> {
    let positions: HashMap<TransactionId, usize> = transactions
        .iter()
        .enumerate()
        .map(|(i, tx)| (tx.id.clone(), i))
        .collect();

    let mut targets = Vec::with_capacity(updates.len());
    for update in updates {
        let pos = positions
            .get(&update.id)
            .copied()
            .ok_or_else(|| MatchError::UnknownTransaction(update.id.clone()))?;
        targets.push((pos, update));
    }

    for (pos, update) in &targets {
        let tx = &mut transactions[*pos];
        tx.match_id = update.match_id.clone();
        tx.linked_ids = update.linked_ids.clone();
        tx.kind = update.kind;
        tx.exclude_from_stats = update.exclude_from_stats;
    }
    Ok(targets.len())
}

/// Drops the ids a duplicate report recommended for removal.
pub fn apply_removals(
    transactions: Vec<Transaction>,
    removals: &BTreeSet<TransactionId>,
) -> Vec<Transaction> {
    transactions
        .into_iter()
        .filter(|tx| !removals.contains(&tx.id))
        .collect()
}

fn lookup<'a>(snapshot: &'a Snapshot, id: &TransactionId) -> Result<&'a Transaction, MatchError> {
    snapshot
        .get(id)
        .ok_or_else(|| MatchError::UnknownTransaction(id.clone()))
}

/// A side may carry this match's own id (re-application) but no other.
fn check_free<'a>(
    tx: &'a Transaction,
    m: &Match,
    touched: &mut HashSet<&'a TransactionId>,
) -> Result<(), MatchError> {
    let foreign = tx.match_id.as_deref().is_some_and(|id| id != m.id);
    if foreign || !touched.insert(&tx.id) {
        return Err(MatchError::AlreadyClaimed(tx.id.clone()));
    }
    Ok(())
}

fn update_for(tx: &Transaction, m: &Match, links: &[TransactionId]) -> TransactionUpdate {
    let mut linked_ids = tx.linked_ids.clone();
    for id in links {
        if !linked_ids.contains(id) {
            linked_ids.push(id.clone());
        }
    }
    TransactionUpdate {
        id: tx.id.clone(),
        match_id: Some(m.id.clone()),
        linked_ids,
        kind: if m.internal {
            TransactionKind::Internal
        } else {
            tx.kind
        },
        exclude_from_stats: m.internal || tx.exclude_from_stats,
    }
}

fn undo_for(tx: &Transaction, m: &Match, links: &[TransactionId]) -> TransactionUpdate {
    let (kind, exclude_from_stats) = if m.internal {
        (TransactionKind::Regular, false)
    } else {
        (tx.kind, tx.exclude_from_stats)
    };
    TransactionUpdate {
        id: tx.id.clone(),
        match_id: None,
        linked_ids: tx
            .linked_ids
            .iter()
            .filter(|id| !links.contains(id))
            .cloned()
            .collect(),
        kind,
        exclude_from_stats,
    }
}
