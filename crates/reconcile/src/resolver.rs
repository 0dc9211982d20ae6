//! Amount resolution: which candidates add up to the target.
//!
//! All amounts are absolute cents. Candidates arrive largest first (see
//! [`candidates_for`](crate::selector::candidates_for)); picks are indices
//! into that slice, in ascending order.

use serde::Serialize;

use crate::model::Confidence;
use crate::strategy::Tolerance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Exact,
    Greedy,
    Exhaustive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub picks: Vec<usize>,
    pub sum_cents: i64,
    /// `target - sum`.
    pub diff_cents: i64,
    pub method: Method,
    pub confidence: Confidence,
}

/// Result of the combination search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Combination {
    Resolved(Resolution),
    /// Nothing fit. `closest` is the nearest subset seen, for the reason text.
    NearMiss {
        closest: Vec<usize>,
        closest_sum_cents: i64,
        exhaustive_skipped: bool,
    },
    NoCandidates,
}

#[derive(Debug, Clone, Copy)]
pub struct AmountResolver {
    pub max_exhaustive: usize,
}

impl AmountResolver {
    pub fn new(max_exhaustive: usize) -> Self {
        Self { max_exhaustive }
    }

    /// Single candidate within epsilon of the target. The closest wins; ties
    /// keep the earlier candidate.
    pub fn exact(&self, target: i64, amounts: &[i64], tolerance: &Tolerance) -> Option<Resolution> {
        let (idx, diff) = amounts
            .iter()
            .enumerate()
            .map(|(i, &a)| (i, target - a))
            .filter(|(_, d)| d.abs() <= tolerance.epsilon_cents)
            .min_by_key(|(i, d)| (d.abs(), *i))?;
        Some(Resolution {
            picks: vec![idx],
            sum_cents: amounts[idx],
            diff_cents: diff,
            method: Method::Exact,
            confidence: Confidence::High,
        })
    }

    /// How many candidates sit within epsilon of the target.
    pub fn exact_hits(&self, target: i64, amounts: &[i64], tolerance: &Tolerance) -> usize {
        amounts
            .iter()
            .filter(|&&a| (target - a).abs() <= tolerance.epsilon_cents)
            .count()
    }

    /// Walks candidates largest first, taking each one that does not
    /// overshoot the remainder by more than the allowance.
    pub fn greedy(&self, target: i64, amounts: &[i64], tolerance: &Tolerance) -> Option<Resolution> {
        let allowed = tolerance.allowed_cents(target);
        let mut remaining = target;
        let mut picks = Vec::new();

        for (i, &amount) in amounts.iter().enumerate() {
            if !picks.is_empty() && remaining.abs() <= allowed {
                break;
            }
            if amount <= remaining.saturating_add(allowed) {
                picks.push(i);
                remaining = remaining.saturating_sub(amount);
            }
        }

        if picks.is_empty() || remaining.abs() > allowed {
            return None;
        }
        Some(Resolution {
            sum_cents: target.saturating_sub(remaining),
            diff_cents: remaining,
            confidence: tolerance.tier(remaining, target),
            picks,
            method: Method::Greedy,
        })
    }

    /// Best subset over every non-empty bitmask, or `None` when the pool is
    /// over the cap. Ties prefer fewer members, then the lower mask.
    pub fn closest_subset(&self, target: i64, amounts: &[i64]) -> Option<(Vec<usize>, i64)> {
        let n = amounts.len();
        if n == 0 || n > self.max_exhaustive {
            return None;
        }

        let mut best: Option<(i64, u32, u32, i64)> = None; // (|diff|, members, mask, sum)
        for mask in 1u32..(1u32 << n) {
            let sum = (0..n)
                .filter(|bit| mask & (1 << bit) != 0)
                .fold(0i64, |acc, bit| acc.saturating_add(amounts[bit]));
            let key = (target.saturating_sub(sum).saturating_abs(), mask.count_ones(), mask, sum);
            if best.map_or(true, |b| (key.0, key.1, key.2) < (b.0, b.1, b.2)) {
                best = Some(key);
            }
        }

        best.map(|(_, _, mask, sum)| {
            let picks = (0..n).filter(|bit| mask & (1 << bit) != 0).collect();
            (picks, sum)
        })
    }

    pub fn exhaustive(&self, target: i64, amounts: &[i64], tolerance: &Tolerance) -> Option<Resolution> {
        let (picks, sum) = self.closest_subset(target, amounts)?;
        let diff = target - sum;
        if diff.abs() > tolerance.allowed_cents(target) {
            return None;
        }
        Some(Resolution {
            picks,
            sum_cents: sum,
            diff_cents: diff,
            method: Method::Exhaustive,
            confidence: tolerance.tier(diff, target),
        })
    }

    /// Greedy first; the exhaustive search only when greedy fails and the
    /// pool is within the cap.
    pub fn combine(&self, target: i64, amounts: &[i64], tolerance: &Tolerance) -> Combination {
        if amounts.is_empty() {
            return Combination::NoCandidates;
        }
        if let Some(resolution) = self.greedy(target, amounts, tolerance) {
            return Combination::Resolved(resolution);
        }
        if amounts.len() > self.max_exhaustive {
            return Combination::NearMiss {
                closest: (0..amounts.len()).collect(),
                closest_sum_cents: total(amounts),
                exhaustive_skipped: true,
            };
        }
        if let Some(resolution) = self.exhaustive(target, amounts, tolerance) {
            return Combination::Resolved(resolution);
        }
        let (closest, closest_sum_cents) = self
            .closest_subset(target, amounts)
            .unwrap_or_else(|| ((0..amounts.len()).collect(), total(amounts)));
        Combination::NearMiss {
            closest,
            closest_sum_cents,
            exhaustive_skipped: false,
        }
    }
}

fn total(amounts: &[i64]) -> i64 {
    amounts.iter().fold(0i64, |acc, &a| acc.saturating_add(a))
}
