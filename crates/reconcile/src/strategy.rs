//! Per-source parameters for the generic matcher.
//!
//! The four feeds differ only in these values, so a single
//! [`SourceMatcher`](crate::matcher::SourceMatcher) runs all of them.

use chrono::NaiveDate;
use tally_core::{Feed, Money};

use crate::classifier::SourceClass;
use crate::config::MatchConfig;
use crate::model::{Confidence, MatchPattern};

/// Days an auxiliary record may sit before or after the primary date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub days_before: u32,
    pub days_after: u32,
}

impl DateWindow {
    pub fn symmetric(days: u32) -> Self {
        Self {
            days_before: days,
            days_after: days,
        }
    }

    /// Looks back over a billing period, with a few days of grace after.
    pub fn trailing(days: u32, grace: u32) -> Self {
        Self {
            days_before: days,
            days_after: grace,
        }
    }

    pub fn extended(self, factor: u32) -> Self {
        Self {
            days_before: self.days_before.saturating_mul(factor),
            days_after: self.days_after.saturating_mul(factor),
        }
    }

    pub fn contains(self, anchor: NaiveDate, date: NaiveDate) -> bool {
        let offset = (date - anchor).num_days();
        offset >= -i64::from(self.days_before) && offset <= i64::from(self.days_after)
    }

    pub fn span_days(self) -> i64 {
        i64::from(self.days_before) + i64::from(self.days_after)
    }
}

/// How the auxiliary amount's sign must relate to the primary's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignRule {
    Same,
    Opposite,
    Any,
}

impl SignRule {
    /// Zero amounts never qualify.
    pub fn admits(self, primary: Money, candidate: Money) -> bool {
        if primary.is_zero() || candidate.is_zero() {
            return false;
        }
        match self {
            SignRule::Same => primary.is_outflow() == candidate.is_outflow(),
            SignRule::Opposite => primary.is_outflow() != candidate.is_outflow(),
            SignRule::Any => true,
        }
    }
}

/// Residual allowances, in cents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub epsilon_cents: i64,
    pub relative: f64,
    pub absolute_cents: i64,
}

impl Tolerance {
    pub fn exact() -> Self {
        Self {
            epsilon_cents: 0,
            relative: 0.0,
            absolute_cents: 0,
        }
    }

    /// Largest residual accepted for a match against `target_cents`.
    pub fn allowed_cents(&self, target_cents: i64) -> i64 {
        let relative = (target_cents.unsigned_abs() as f64 * self.relative).round() as i64;
        self.epsilon_cents.max(relative).max(self.absolute_cents)
    }

    pub fn tier(&self, diff_cents: i64, target_cents: i64) -> Confidence {
        let diff = diff_cents.unsigned_abs();
        if diff <= self.epsilon_cents.unsigned_abs() {
            Confidence::High
        } else if diff <= self.allowed_cents(target_cents).unsigned_abs() {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// The residual bound that belongs to a tier.
    pub fn bound_for(&self, tier: Confidence, target_cents: i64) -> i64 {
        match tier {
            Confidence::High => self.epsilon_cents,
            Confidence::Medium | Confidence::Low => self.allowed_cents(target_cents),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Strategy {
    pub pattern: MatchPattern,
    /// Classification a primary needs to enter this matcher.
    pub class: SourceClass,
    /// Feed the candidate pool is drawn from.
    pub feed: Feed,
    pub window: DateWindow,
    pub extension_factor: u32,
    pub tolerance: Tolerance,
    pub sign: SignRule,
    pub allow_combinations: bool,
    pub capture_billing_period: bool,
    pub mark_internal: bool,
}

impl Strategy {
    pub fn processor(config: &MatchConfig) -> Self {
        Self {
            pattern: MatchPattern::ProcessorBank,
            class: SourceClass::Processor,
            feed: Feed::Processor,
            window: DateWindow::symmetric(config.windows.processor_days),
            extension_factor: config.windows.extension_factor,
            tolerance: Tolerance {
                epsilon_cents: config.tolerance.epsilon_cents,
                relative: config.tolerance.relative,
                absolute_cents: 0,
            },
            sign: SignRule::Same,
            allow_combinations: true,
            capture_billing_period: false,
            mark_internal: false,
        }
    }

    pub fn card(config: &MatchConfig) -> Self {
        Self {
            pattern: MatchPattern::CardBank,
            class: SourceClass::CardIssuer,
            feed: Feed::Card,
            window: DateWindow::trailing(
                config.windows.card_billing_days,
                config.windows.card_grace_days,
            ),
            extension_factor: config.windows.extension_factor,
            tolerance: Tolerance {
                epsilon_cents: config.tolerance.epsilon_cents,
                relative: config.tolerance.relative,
                absolute_cents: config.tolerance.card_allowance_cents,
            },
            sign: SignRule::Same,
            allow_combinations: true,
            capture_billing_period: true,
            mark_internal: false,
        }
    }

    /// Transfers must mirror each other to the cent, one leg at a time.
    pub fn transfer(config: &MatchConfig) -> Self {
        Self {
            pattern: MatchPattern::TransferBank,
            class: SourceClass::TransferPartner,
            feed: Feed::Transfer,
            window: DateWindow::symmetric(config.windows.transfer_days),
            extension_factor: config.windows.extension_factor,
            tolerance: Tolerance::exact(),
            sign: SignRule::Opposite,
            allow_combinations: false,
            capture_billing_period: false,
            mark_internal: true,
        }
    }

    /// Order exports list totals without a sign convention.
    pub fn order_history(config: &MatchConfig) -> Self {
        Self {
            pattern: MatchPattern::OrderBank,
            class: SourceClass::Merchant,
            feed: Feed::OrderHistory,
            window: DateWindow::symmetric(config.windows.order_days),
            extension_factor: config.windows.extension_factor,
            tolerance: Tolerance {
                epsilon_cents: config.tolerance.epsilon_cents,
                relative: config.tolerance.relative,
                absolute_cents: 0,
            },
            sign: SignRule::Any,
            allow_combinations: true,
            capture_billing_period: false,
            mark_internal: false,
        }
    }

    /// Run order: processor, card, transfer, order history.
    pub fn all(config: &MatchConfig) -> Vec<Self> {
        vec![
            Self::processor(config),
            Self::card(config),
            Self::transfer(config),
            Self::order_history(config),
        ]
    }

    pub fn extended_window(&self) -> DateWindow {
        self.window.extended(self.extension_factor)
    }
}
