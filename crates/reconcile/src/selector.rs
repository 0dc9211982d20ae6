use chrono::NaiveDate;
use tally_core::Transaction;

use crate::claims::ClaimSet;
use crate::strategy::{DateWindow, SignRule};

/// Auxiliary records dated inside `window` around `target` that no match has
/// claimed yet. Pool order is preserved.
pub fn select_candidates<'a>(
    target: NaiveDate,
    pool: &[&'a Transaction],
    window: DateWindow,
    claims: &ClaimSet,
) -> Vec<&'a Transaction> {
    pool.iter()
        .copied()
        .filter(|tx| window.contains(target, tx.date))
        .filter(|tx| !claims.contains(&tx.id))
        .collect()
}

/// Windowed candidates for `primary` that also satisfy the sign rule, ordered
/// for the amount resolver: largest magnitude first, then nearest date, then
/// id.
pub fn candidates_for<'a>(
    primary: &Transaction,
    pool: &[&'a Transaction],
    window: DateWindow,
    sign: SignRule,
    claims: &ClaimSet,
) -> Vec<&'a Transaction> {
    let mut found: Vec<&Transaction> = select_candidates(primary.date, pool, window, claims)
        .into_iter()
        .filter(|tx| tx.id != primary.id && sign.admits(primary.amount, tx.amount))
        .collect();
    found.sort_by(|a, b| {
        b.amount
            .abs()
            .cmp(&a.amount.abs())
            .then_with(|| day_distance(primary.date, a.date).cmp(&day_distance(primary.date, b.date)))
            .then_with(|| a.id.cmp(&b.id))
    });
    found
}

pub fn day_distance(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}
