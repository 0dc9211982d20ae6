use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tally_core::{Snapshot, Transaction};

use crate::config::DuplicateConfig;
use crate::model::{DuplicateGroup, DuplicateReport};
use crate::text::{fragment, similarity};

/// Groups primary bank transactions that look like re-imports of the same
/// event. Works on the snapshot alone; matches play no part.
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    config: DuplicateConfig,
}

struct Cluster<'a> {
    fragment: String,
    members: Vec<&'a Transaction>,
}

impl DuplicateDetector {
    pub fn new(config: DuplicateConfig) -> Self {
        Self { config }
    }

    pub fn detect(&self, snapshot: &Snapshot) -> DuplicateReport {
        let mut buckets: BTreeMap<(NaiveDate, i64), Vec<&Transaction>> = BTreeMap::new();
        for tx in snapshot.transactions().iter().filter(|t| t.is_primary()) {
            buckets
                .entry((tx.date, tx.amount.to_cents()))
                .or_default()
                .push(tx);
        }

        let mut report = DuplicateReport::default();
        for ((date, cents), members) in buckets {
            if members.len() < 2 {
                continue;
            }
            for cluster in self.cluster(members) {
                if cluster.members.len() < 2 {
                    continue;
                }
                let group = build_group(format!("{date}|{cents}|{}", cluster.fragment), &cluster.members);
                report.removals.extend(group.remove_ids.iter().cloned());
                report.groups.push(group);
            }
        }
        report.groups.sort_by(|a, b| a.key.cmp(&b.key));
        report
    }

    /// Splits one (day, amount) bucket by description. A transaction joins
    /// the first cluster whose fragment is similar enough.
    fn cluster<'a>(&self, members: Vec<&'a Transaction>) -> Vec<Cluster<'a>> {
        let mut clusters: Vec<Cluster<'a>> = Vec::new();
        for tx in members {
            let frag = fragment(&tx.description, self.config.fragment_len);
            match clusters
                .iter_mut()
                .find(|c| similarity(&c.fragment, &frag) >= self.config.similarity)
            {
                Some(cluster) => cluster.members.push(tx),
                None => clusters.push(Cluster {
                    fragment: frag,
                    members: vec![tx],
                }),
            }
        }
        clusters
    }
}

/// How much metadata a record carries. The richest copy is kept.
pub fn completeness(tx: &Transaction) -> u32 {
    let mut score = 0;
    if let Some(source) = &tx.source {
        score += 2;
        if source.external_id.as_deref().is_some_and(|e| !e.is_empty()) {
            score += 2;
        }
    }
    if tx.beneficiary.as_deref().is_some_and(|b| !b.is_empty()) {
        score += 1;
    }
    if tx.category.is_some() {
        score += 2;
    }
    if tx.match_id.is_some() {
        score += 3;
    }
    score + tx.linked_ids.len() as u32
}

fn build_group(key: String, members: &[&Transaction]) -> DuplicateGroup {
    // Strictly greater wins, so ties keep the earliest in snapshot order.
    let keep = members.iter().copied().skip(1).fold(members[0], |best, tx| {
        if completeness(tx) > completeness(best) {
            tx
        } else {
            best
        }
    });

    let remove_ids: BTreeSet<_> = members
        .iter()
        .filter(|tx| tx.id != keep.id)
        .map(|tx| tx.id.clone())
        .collect();

    DuplicateGroup {
        key,
        transaction_ids: members.iter().map(|tx| tx.id.clone()).collect(),
        keep_id: keep.id.clone(),
        remove_ids: remove_ids.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{Feed, Money, SourceTag, TransactionId, TransactionKind};

    fn tx(id: &str, date: (i32, u32, u32), desc: &str, cents: i64) -> Transaction {
        Transaction {
            id: TransactionId::from(id),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            amount: Money::from_cents(cents),
            description: desc.to_string(),
            beneficiary: None,
            source: None,
            match_id: None,
            context_only: false,
            linked_ids: vec![],
            category: None,
            kind: TransactionKind::Regular,
            exclude_from_stats: false,
        }
    }

    fn detect(txs: Vec<Transaction>) -> DuplicateReport {
        let snapshot = Snapshot::new(txs).unwrap();
        DuplicateDetector::new(DuplicateConfig::default()).detect(&snapshot)
    }

    #[test]
    fn identical_records_group() {
        let report = detect(vec![
            tx("a", (2024, 1, 15), "STARBUCKS", -500),
            tx("b", (2024, 1, 15), "Starbucks ", -500),
            tx("c", (2024, 1, 20), "WHOLE FOODS", -3000),
        ]);
        assert_eq!(report.groups.len(), 1);
        let group = &report.groups[0];
        assert_eq!(group.key, "2024-01-15|-500|starbucks");
        assert_eq!(group.keep_id.as_str(), "a"); // tie keeps the first
        assert_eq!(group.remove_ids, vec![TransactionId::from("b")]);
        assert!(report.removals.contains(&TransactionId::from("b")));
    }

    #[test]
    fn different_amounts_or_days_do_not_group() {
        let report = detect(vec![
            tx("a", (2024, 1, 15), "STARBUCKS", -500),
            tx("b", (2024, 1, 15), "STARBUCKS", -600),
            tx("c", (2024, 1, 16), "STARBUCKS", -500),
        ]);
        assert!(report.groups.is_empty());
        assert!(report.removals.is_empty());
    }

    #[test]
    fn different_descriptions_split_a_bucket() {
        let report = detect(vec![
            tx("a", (2024, 1, 15), "STARBUCKS", -500),
            tx("b", (2024, 1, 15), "PARKING GARAGE", -500),
        ]);
        assert!(report.groups.is_empty());
    }

    #[test]
    fn richer_record_is_kept() {
        let mut rich = tx("b", (2024, 1, 15), "REWE SAGT DANKE 4411", -2345);
        rich.source = Some(SourceTag {
            feed: Feed::Bank,
            external_id: Some("fit-77".to_string()),
        });
        rich.category = Some("groceries".to_string());
        let report = detect(vec![tx("a", (2024, 1, 15), "REWE SAGT DANKE 4411", -2345), rich]);
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].keep_id.as_str(), "b");
        assert_eq!(report.groups[0].remove_ids, vec![TransactionId::from("a")]);
    }

    #[test]
    fn auxiliary_feeds_are_ignored() {
        let mut card = tx("c1", (2024, 1, 15), "STARBUCKS", -500);
        card.source = Some(SourceTag {
            feed: Feed::Card,
            external_id: None,
        });
        let report = detect(vec![tx("a", (2024, 1, 15), "STARBUCKS", -500), card]);
        assert!(report.groups.is_empty());
    }

    #[test]
    fn three_copies_remove_two() {
        let mut matched = tx("b", (2024, 2, 1), "NETFLIX.COM", -1299);
        matched.match_id = Some("processor:b".to_string());
        let report = detect(vec![
            tx("a", (2024, 2, 1), "NETFLIX.COM", -1299),
            matched,
            tx("c", (2024, 2, 1), "netflix com", -1299),
        ]);
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].keep_id.as_str(), "b");
        assert_eq!(report.removals.len(), 2);
    }

    #[test]
    fn completeness_scoring() {
        let mut t = tx("a", (2024, 1, 1), "X", -1);
        assert_eq!(completeness(&t), 0);
        t.beneficiary = Some("Shop".to_string());
        t.linked_ids = vec![TransactionId::from("o1"), TransactionId::from("o2")];
        assert_eq!(completeness(&t), 3);
    }
}
