use std::collections::HashSet;
use tally_core::{DateRange, Money, Transaction, TransactionId};

use crate::claims::ClaimSet;
use crate::config::SearchConfig;
use crate::model::{Confidence, Match, MatchType, Provenance, Suggestion};
use crate::resolver::{AmountResolver, Combination, Resolution};
use crate::selector::{candidates_for, day_distance};
use crate::strategy::{DateWindow, Strategy};

#[derive(Debug, Default)]
pub struct MatcherOutput {
    pub matches: Vec<Match>,
    pub suggestions: Vec<Suggestion>,
    /// Primaries that were still unclaimed when the matcher started.
    pub processed: usize,
}

/// Three-pass matcher shared by every feed. Strategy values decide windows,
/// tolerances and linkage semantics.
pub struct SourceMatcher<'s> {
    strategy: &'s Strategy,
    resolver: AmountResolver,
    max_suggestion_candidates: usize,
}

impl<'s> SourceMatcher<'s> {
    pub fn new(strategy: &'s Strategy, search: &SearchConfig) -> Self {
        Self {
            strategy,
            resolver: AmountResolver::new(search.max_exhaustive_candidates),
            max_suggestion_candidates: search.max_suggestion_candidates,
        }
    }

    /// `primaries` are bank transactions classified for this strategy;
    /// `pool` holds the strategy's feed. Accepted matches are claimed in
    /// `claims` as soon as they are made.
    pub fn run(
        &self,
        primaries: &[&Transaction],
        pool: &[&Transaction],
        claims: &mut ClaimSet,
    ) -> MatcherOutput {
        let mut out = MatcherOutput {
            processed: primaries.iter().filter(|p| !claims.contains(&p.id)).count(),
            ..MatcherOutput::default()
        };
        let mut suggested: HashSet<TransactionId> = HashSet::new();

        self.pass_exact(primaries, pool, claims, &mut out);
        if self.strategy.allow_combinations {
            self.pass_combination(primaries, pool, claims, &mut suggested, &mut out);
            // A later primary may have claimed records an earlier near miss
            // listed. Those primaries go back to the residual pass.
            out.suggestions.retain(|s| {
                let open = s.candidate_ids.iter().all(|id| !claims.contains(id));
                if !open {
                    suggested.remove(&s.primary_id);
                }
                open
            });
        }
        self.pass_residual(primaries, pool, claims, &suggested, &mut out);

        tracing::info!(
            "{} matcher: {} processed, {} matched, {} suggested",
            self.strategy.pattern,
            out.processed,
            out.matches.len(),
            out.suggestions.len()
        );
        out
    }

    // Pass 1: 1:1

    fn pass_exact(
        &self,
        primaries: &[&Transaction],
        pool: &[&Transaction],
        claims: &mut ClaimSet,
        out: &mut MatcherOutput,
    ) {
        let tolerance = &self.strategy.tolerance;
        for &primary in primaries {
            if claims.contains(&primary.id) {
                continue;
            }
            let candidates = candidates_for(
                primary,
                pool,
                self.strategy.window,
                self.strategy.sign,
                claims,
            );
            if candidates.is_empty() {
                continue;
            }
            let target = target_cents(primary);
            let amounts = amounts_of(&candidates);
            let Some(resolution) = self.resolver.exact(target, &amounts, tolerance) else {
                continue;
            };
            let unambiguous = self.resolver.exact_hits(target, &amounts, tolerance) == 1;
            let linked: Vec<&Transaction> =
                resolution.picks.iter().map(|&i| candidates[i]).collect();
            self.accept(primary, &linked, &resolution, unambiguous, claims, out);
        }
    }

    // Pass 2: many:1

    fn pass_combination(
        &self,
        primaries: &[&Transaction],
        pool: &[&Transaction],
        claims: &mut ClaimSet,
        suggested: &mut HashSet<TransactionId>,
        out: &mut MatcherOutput,
    ) {
        let tolerance = &self.strategy.tolerance;
        for &primary in primaries {
            if claims.contains(&primary.id) {
                continue;
            }
            let candidates = candidates_for(
                primary,
                pool,
                self.strategy.window,
                self.strategy.sign,
                claims,
            );
            if candidates.len() < 2 {
                continue;
            }
            let target = target_cents(primary);
            let amounts = amounts_of(&candidates);

            match self.resolver.combine(target, &amounts, tolerance) {
                Combination::Resolved(resolution) => {
                    let linked: Vec<&Transaction> =
                        resolution.picks.iter().map(|&i| candidates[i]).collect();
                    self.accept(primary, &linked, &resolution, false, claims, out);
                }
                Combination::NearMiss {
                    closest,
                    exhaustive_skipped,
                    ..
                } => {
                    let (listed, prefix) = if exhaustive_skipped {
                        tracing::warn!(
                            "{} candidates for {} exceed the exhaustive search limit of {}",
                            candidates.len(),
                            primary.id,
                            self.resolver.max_exhaustive
                        );
                        (
                            self.closest_by_amount(primary, candidates.clone()),
                            format!(
                                "{} candidates exceed the exhaustive search limit of {} and no greedy combination fits",
                                candidates.len(),
                                self.resolver.max_exhaustive
                            ),
                        )
                    } else {
                        let listed: Vec<&Transaction> = closest
                            .iter()
                            .map(|&i| candidates[i])
                            .take(self.max_suggestion_candidates)
                            .collect();
                        let prefix = format!(
                            "closest combination of {} candidate(s) does not fit",
                            listed.len()
                        );
                        (listed, prefix)
                    };
                    let suggestion =
                        self.suggest(primary, &listed, self.strategy.window, prefix, None);
                    suggested.insert(primary.id.clone());
                    out.suggestions.push(suggestion);
                }
                Combination::NoCandidates => {}
            }
        }
    }

    // Pass 3: residual suggestions

    fn pass_residual(
        &self,
        primaries: &[&Transaction],
        pool: &[&Transaction],
        claims: &ClaimSet,
        suggested: &HashSet<TransactionId>,
        out: &mut MatcherOutput,
    ) {
        let window = self.strategy.extended_window();
        for &primary in primaries {
            if claims.contains(&primary.id) || suggested.contains(&primary.id) {
                continue;
            }
            let candidates =
                candidates_for(primary, pool, window, self.strategy.sign, claims);
            if candidates.is_empty() {
                continue;
            }
            let total = candidates.len();
            let listed = self.closest_by_amount(primary, candidates);
            let prefix = format!(
                "{total} candidate(s) within the extended window (-{}/+{} days), listing {}",
                window.days_before,
                window.days_after,
                listed.len()
            );
            out.suggestions
                .push(self.suggest(primary, &listed, window, prefix, Some(Confidence::Low)));
        }
    }

    // Helpers

    fn accept(
        &self,
        primary: &Transaction,
        linked: &[&Transaction],
        resolution: &Resolution,
        unambiguous: bool,
        claims: &mut ClaimSet,
        out: &mut MatcherOutput,
    ) {
        let m = build_match(
            self.strategy,
            primary,
            linked,
            resolution.confidence,
            Provenance::Auto,
            unambiguous,
        );
        tracing::debug!(
            "{} {} match {} via {:?}: {} linked, diff {}",
            m.confidence,
            m.match_type,
            m.id,
            resolution.method,
            m.linked_ids.len(),
            m.amount_difference
        );
        claims.claim_match(&m);
        out.matches.push(m);
    }

    /// Nearest amounts first, then nearest dates; capped for display.
    fn closest_by_amount<'a>(
        &self,
        primary: &Transaction,
        mut candidates: Vec<&'a Transaction>,
    ) -> Vec<&'a Transaction> {
        let target = target_cents(primary);
        candidates.sort_by_key(|tx| {
            (
                (tx.amount.abs().to_cents() - target).abs(),
                day_distance(primary.date, tx.date),
            )
        });
        candidates.truncate(self.max_suggestion_candidates);
        candidates
    }

    fn suggest(
        &self,
        primary: &Transaction,
        listed: &[&Transaction],
        window: DateWindow,
        prefix: String,
        confidence: Option<Confidence>,
    ) -> Suggestion {
        let target_amount = primary.amount.abs();
        let candidate_amount: Money = listed.iter().map(|tx| tx.amount.abs()).sum();
        let shortfall = target_amount - candidate_amount;
        let target = target_amount.to_cents();
        let confidence = confidence.unwrap_or_else(|| {
            self.strategy.tolerance.tier(shortfall.to_cents(), target)
        });

        let reason = if shortfall.is_zero() {
            format!("{prefix}: candidates total {candidate_amount}, equal to {target_amount}")
        } else if shortfall.is_outflow() {
            format!(
                "{prefix}: candidates total {candidate_amount}, {} over {target_amount}",
                shortfall.abs()
            )
        } else {
            format!("{prefix}: candidates total {candidate_amount}, {shortfall} short of {target_amount}")
        };

        let suggestion = Suggestion {
            pattern: self.strategy.pattern,
            primary_id: primary.id.clone(),
            candidate_ids: listed.iter().map(|tx| tx.id.clone()).collect(),
            score: score(primary, listed, shortfall, window),
            reason,
            confidence,
            target_amount,
            candidate_amount,
            shortfall,
        };
        tracing::debug!("suggestion for {}: {}", suggestion.primary_id, suggestion.reason);
        suggestion
    }
}

/// Builds a match record for `primary` settled by `linked`. Shared with
/// manual matching so both produce the same shape.
pub(crate) fn build_match(
    strategy: &Strategy,
    primary: &Transaction,
    linked: &[&Transaction],
    confidence: Confidence,
    provenance: Provenance,
    unambiguous: bool,
) -> Match {
    let matched_amount = primary.amount.abs();
    let linked_amount: Money = linked.iter().map(|tx| tx.amount.abs()).sum();
    let amount_difference = matched_amount - linked_amount;
    let target = matched_amount.to_cents();

    let tolerance = match confidence {
        // Low-tier matches only exist when a person accepted them as is.
        Confidence::Low => amount_difference.abs(),
        tier => Money::from_cents(strategy.tolerance.bound_for(tier, target)),
    };

    let internal = strategy.mark_internal
        && unambiguous
        && linked.len() == 1
        && amount_difference.is_zero()
        && primary.amount.is_outflow() != linked[0].amount.is_outflow();

    let id = match provenance {
        Provenance::Auto => format!("{}:{}", strategy.pattern.code(), primary.id),
        Provenance::Manual => format!("manual:{}:{}", strategy.pattern.code(), primary.id),
    };

    Match {
        id,
        pattern: strategy.pattern,
        provenance,
        confidence,
        match_type: MatchType::for_linked_count(linked.len()),
        primary_id: primary.id.clone(),
        linked_ids: linked.iter().map(|tx| tx.id.clone()).collect(),
        matched_amount,
        linked_amount,
        amount_difference,
        tolerance,
        date_difference_days: linked
            .iter()
            .map(|tx| day_distance(primary.date, tx.date))
            .max()
            .unwrap_or(0),
        billing_period: if strategy.capture_billing_period {
            DateRange::spanning(linked.iter().map(|tx| tx.date))
        } else {
            None
        },
        internal,
    }
}

fn target_cents(primary: &Transaction) -> i64 {
    primary.amount.abs().to_cents()
}

fn amounts_of(candidates: &[&Transaction]) -> Vec<i64> {
    candidates.iter().map(|tx| tx.amount.abs().to_cents()).collect()
}

/// Mean of amount closeness and date closeness.
fn score(primary: &Transaction, listed: &[&Transaction], shortfall: Money, window: DateWindow) -> f32 {
    let target = primary.amount.abs().to_cents().max(1) as f32;
    let amount_score = 1.0 - (shortfall.abs().to_cents() as f32 / target).min(1.0);
    let farthest = listed
        .iter()
        .map(|tx| day_distance(primary.date, tx.date))
        .max()
        .unwrap_or(0);
    let date_score = (1.0 - farthest as f32 / (window.span_days() + 1) as f32).max(0.0);
    (amount_score + date_score) / 2.0
}
