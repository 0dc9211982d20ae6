use std::collections::HashMap;
use tally_core::{Snapshot, Transaction, TransactionId};

use crate::claims::ClaimSet;
use crate::classifier::{PatternClassifier, SourceClass};
use crate::config::{ConfigError, MatchConfig};
use crate::duplicates::DuplicateDetector;
use crate::error::MatchError;
use crate::manual;
use crate::matcher::SourceMatcher;
use crate::model::{DuplicateReport, Match, MatchPattern, RunReport, RunStats, Suggestion};
use crate::strategy::Strategy;

/// Entry point for a reconciliation run. Holds compiled configuration only;
/// every call works on the snapshot it is given.
#[derive(Debug)]
pub struct ReconciliationEngine {
    config: MatchConfig,
    classifier: PatternClassifier,
    strategies: Vec<Strategy>,
}

impl ReconciliationEngine {
    pub fn new(config: MatchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let classifier = PatternClassifier::new(&config.patterns)?;
        let strategies = Strategy::all(&config);
        Ok(Self {
            config,
            classifier,
            strategies,
        })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn strategy(&self, pattern: MatchPattern) -> &Strategy {
        let index = match pattern {
            MatchPattern::ProcessorBank => 0,
            MatchPattern::CardBank => 1,
            MatchPattern::TransferBank => 2,
            MatchPattern::OrderBank => 3,
        };
        &self.strategies[index]
    }

    /// Runs every matcher over the unsettled primaries of `snapshot`.
    /// `existing` holds matches accepted in earlier runs; their ids are never
    /// offered again.
    #[tracing::instrument(skip_all, fields(transactions = snapshot.len(), existing = existing.len()))]
    pub fn run(&self, snapshot: &Snapshot, existing: &[Match]) -> RunReport {
        let mut claims = ClaimSet::seeded(snapshot, existing);
        let mut stats = RunStats::default();

        let mut by_class: HashMap<SourceClass, Vec<&Transaction>> = HashMap::new();
        for tx in snapshot.transactions().iter().filter(|tx| tx.is_primary()) {
            if claims.contains(&tx.id) {
                stats.already_matched += 1;
                continue;
            }
            match self.classifier.classify(tx) {
                Some(class) => by_class.entry(class).or_default().push(tx),
                None => stats.unclassified += 1,
            }
        }

        let mut report = RunReport::default();
        for strategy in &self.strategies {
            let Some(primaries) = by_class.get(&strategy.class) else {
                continue;
            };
            let pool: Vec<&Transaction> = snapshot
                .transactions()
                .iter()
                .filter(|tx| tx.feed() == strategy.feed)
                .collect();

            let out = SourceMatcher::new(strategy, &self.config.search).run(primaries, &pool, &mut claims);
            stats.processed += out.processed;
            report.matches.extend(out.matches);
            report.suggestions.extend(out.suggestions);
        }

        stats.auto_matched = report.matches.len();
        stats.suggested = report.suggestions.len();
        tracing::info!(
            "run complete: {} processed, {} matched, {} suggested, {} already matched, {} unclassified",
            stats.processed,
            stats.auto_matched,
            stats.suggested,
            stats.already_matched,
            stats.unclassified
        );
        report.stats = stats;
        report
    }

    pub fn detect_duplicates(&self, snapshot: &Snapshot) -> DuplicateReport {
        let report = DuplicateDetector::new(self.config.duplicates.clone()).detect(snapshot);
        tracing::info!(
            "duplicate scan: {} groups, {} removals",
            report.groups.len(),
            report.removals.len()
        );
        report
    }

    pub fn manual_match(
        &self,
        snapshot: &Snapshot,
        existing: &[Match],
        pattern: MatchPattern,
        primary_id: &TransactionId,
        linked_ids: &[TransactionId],
    ) -> Result<Match, MatchError> {
        manual::manual_match(snapshot, existing, self.strategy(pattern), primary_id, linked_ids)
    }

    pub fn accept_suggestion(
        &self,
        snapshot: &Snapshot,
        existing: &[Match],
        suggestion: &Suggestion,
        chosen: &[TransactionId],
    ) -> Result<Match, MatchError> {
        manual::accept_suggestion(
            snapshot,
            existing,
            self.strategy(suggestion.pattern),
            suggestion,
            chosen,
        )
    }
}
