use std::collections::HashSet;
use tally_core::{Snapshot, Transaction, TransactionId};

use crate::claims::ClaimSet;
use crate::error::MatchError;
use crate::matcher::build_match;
use crate::model::{Match, Provenance, Suggestion};
use crate::strategy::Strategy;

/// Builds a match from caller-chosen ids. The confidence tier comes from the
/// residual exactly as for automatic matches, but a low tier is accepted.
pub fn manual_match(
    snapshot: &Snapshot,
    existing: &[Match],
    strategy: &Strategy,
    primary_id: &TransactionId,
    linked_ids: &[TransactionId],
) -> Result<Match, MatchError> {
    if linked_ids.is_empty() {
        return Err(MatchError::NoLinkedTransactions);
    }
    let claims = ClaimSet::seeded(snapshot, existing);

    let primary = lookup(snapshot, primary_id)?;
    if !primary.is_primary() {
        return Err(MatchError::NotPrimary(primary_id.clone()));
    }
    if claims.contains(primary_id) {
        return Err(MatchError::AlreadyClaimed(primary_id.clone()));
    }
    if linked_ids.len() > 1 && !strategy.allow_combinations {
        return Err(MatchError::CombinationNotAllowed(primary_id.clone()));
    }

    let mut seen = HashSet::new();
    let mut linked: Vec<&Transaction> = Vec::with_capacity(linked_ids.len());
    for id in linked_ids {
        let tx = lookup(snapshot, id)?;
        if tx.feed() != strategy.feed {
            return Err(MatchError::WrongFeed {
                id: id.clone(),
                expected: strategy.feed,
                found: tx.feed(),
            });
        }
        if claims.contains(id) || !seen.insert(id) {
            return Err(MatchError::AlreadyClaimed(id.clone()));
        }
        if !strategy.sign.admits(primary.amount, tx.amount) {
            return Err(MatchError::SignMismatch { id: id.clone() });
        }
        linked.push(tx);
    }

    let linked_cents = linked
        .iter()
        .fold(0i64, |acc, tx| acc.saturating_add(tx.amount.abs().to_cents()));
    let target = primary.amount.abs().to_cents();
    let confidence = strategy.tolerance.tier(target - linked_cents, target);

    let m = build_match(strategy, primary, &linked, confidence, Provenance::Manual, true);
    tracing::info!("manual {} match {} with {} linked", m.confidence, m.id, m.linked_ids.len());
    Ok(m)
}

/// Confirms `chosen` out of a suggestion's candidates.
pub fn accept_suggestion(
    snapshot: &Snapshot,
    existing: &[Match],
    strategy: &Strategy,
    suggestion: &Suggestion,
    chosen: &[TransactionId],
) -> Result<Match, MatchError> {
    if let Some(stray) = chosen.iter().find(|id| !suggestion.candidate_ids.contains(id)) {
        return Err(MatchError::NotACandidate(stray.clone()));
    }
    manual_match(snapshot, existing, strategy, &suggestion.primary_id, chosen)
}

fn lookup<'a>(snapshot: &'a Snapshot, id: &TransactionId) -> Result<&'a Transaction, MatchError> {
    snapshot
        .get(id)
        .ok_or_else(|| MatchError::UnknownTransaction(id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::model::{Confidence, MatchPattern, MatchType};
    use chrono::NaiveDate;
    use tally_core::{Feed, Money, SourceTag, TransactionKind};

    fn tx(id: &str, feed: Feed, cents: i64) -> Transaction {
        Transaction {
            id: TransactionId::from(id),
            date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            amount: Money::from_cents(cents),
            description: String::new(),
            beneficiary: None,
            source: Some(SourceTag {
                feed,
                external_id: None,
            }),
            match_id: None,
            context_only: false,
            linked_ids: vec![],
            category: None,
            kind: TransactionKind::Regular,
            exclude_from_stats: false,
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot::new(vec![
            tx("b1", Feed::Bank, -10_000),
            tx("p1", Feed::Processor, -3500),
            tx("p2", Feed::Processor, -2500),
            tx("c1", Feed::Card, -10_000),
            tx("t1", Feed::Transfer, 10_000),
        ])
        .unwrap()
    }

    fn ids(raw: &[&str]) -> Vec<TransactionId> {
        raw.iter().map(|&id| TransactionId::from(id)).collect()
    }

    #[test]
    fn manual_match_accepts_low_residual() {
        let strategy = Strategy::processor(&MatchConfig::default());
        let m = manual_match(
            &snapshot(),
            &[],
            &strategy,
            &TransactionId::from("b1"),
            &ids(&["p1", "p2"]),
        )
        .unwrap();
        assert_eq!(m.id, "manual:processor:b1");
        assert_eq!(m.provenance, Provenance::Manual);
        assert_eq!(m.confidence, Confidence::Low);
        assert_eq!(m.match_type, MatchType::ManyToOne);
        assert_eq!(m.amount_difference, Money::from_cents(4000));
        assert_eq!(m.tolerance, Money::from_cents(4000));
    }

    #[test]
    fn wrong_feed_is_rejected() {
        let strategy = Strategy::processor(&MatchConfig::default());
        let err = manual_match(&snapshot(), &[], &strategy, &TransactionId::from("b1"), &ids(&["c1"]))
            .unwrap_err();
        assert!(matches!(
            err,
            MatchError::WrongFeed {
                expected: Feed::Processor,
                found: Feed::Card,
                ..
            }
        ));
    }

    #[test]
    fn claimed_ids_are_rejected() {
        let strategy = Strategy::processor(&MatchConfig::default());
        let first = manual_match(&snapshot(), &[], &strategy, &TransactionId::from("b1"), &ids(&["p1"]))
            .unwrap();
        let err = manual_match(
            &snapshot(),
            &[first],
            &strategy,
            &TransactionId::from("b1"),
            &ids(&["p2"]),
        )
        .unwrap_err();
        assert_eq!(err, MatchError::AlreadyClaimed(TransactionId::from("b1")));
    }

    #[test]
    fn structural_errors() {
        let strategy = Strategy::processor(&MatchConfig::default());
        let snap = snapshot();
        let b1 = TransactionId::from("b1");
        assert_eq!(
            manual_match(&snap, &[], &strategy, &b1, &[]).unwrap_err(),
            MatchError::NoLinkedTransactions
        );
        assert_eq!(
            manual_match(&snap, &[], &strategy, &TransactionId::from("p1"), &ids(&["p2"])).unwrap_err(),
            MatchError::NotPrimary(TransactionId::from("p1"))
        );
        assert_eq!(
            manual_match(&snap, &[], &strategy, &b1, &ids(&["p1", "p1"])).unwrap_err(),
            MatchError::AlreadyClaimed(TransactionId::from("p1"))
        );
        assert_eq!(
            manual_match(&snap, &[], &strategy, &b1, &ids(&["zz"])).unwrap_err(),
            MatchError::UnknownTransaction(TransactionId::from("zz"))
        );
    }

    #[test]
    fn manual_transfer_is_internal() {
        let strategy = Strategy::transfer(&MatchConfig::default());
        let m = manual_match(&snapshot(), &[], &strategy, &TransactionId::from("b1"), &ids(&["t1"]))
            .unwrap();
        assert_eq!(m.pattern, MatchPattern::TransferBank);
        assert_eq!(m.confidence, Confidence::High);
        assert!(m.internal);
    }

    #[test]
    fn transfer_refuses_combinations() {
        let strategy = Strategy::transfer(&MatchConfig::default());
        let err = manual_match(
            &snapshot(),
            &[],
            &strategy,
            &TransactionId::from("b1"),
            &ids(&["t1", "p1"]),
        )
        .unwrap_err();
        assert_eq!(err, MatchError::CombinationNotAllowed(TransactionId::from("b1")));
    }

    #[test]
    fn accept_suggestion_checks_candidates() {
        let strategy = Strategy::processor(&MatchConfig::default());
        let suggestion = Suggestion {
            pattern: MatchPattern::ProcessorBank,
            primary_id: TransactionId::from("b1"),
            candidate_ids: ids(&["p1"]),
            score: 0.5,
            reason: String::new(),
            confidence: Confidence::Low,
            target_amount: Money::from_cents(10_000),
            candidate_amount: Money::from_cents(3500),
            shortfall: Money::from_cents(6500),
        };
        let snap = snapshot();
        assert_eq!(
            accept_suggestion(&snap, &[], &strategy, &suggestion, &ids(&["p2"])).unwrap_err(),
            MatchError::NotACandidate(TransactionId::from("p2"))
        );
        let m = accept_suggestion(&snap, &[], &strategy, &suggestion, &ids(&["p1"])).unwrap();
        assert_eq!(m.linked_ids, ids(&["p1"]));
    }
}
