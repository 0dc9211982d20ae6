use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tally_core::{DateRange, Money, TransactionId};

/// Which pair of feeds a match links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPattern {
    ProcessorBank,
    CardBank,
    TransferBank,
    OrderBank,
}

impl MatchPattern {
    pub fn code(self) -> &'static str {
        match self {
            MatchPattern::ProcessorBank => "processor",
            MatchPattern::CardBank => "card",
            MatchPattern::TransferBank => "transfer",
            MatchPattern::OrderBank => "order",
        }
    }

    /// Order-history records are context only; the link lives on the bank
    /// side alone.
    pub fn is_one_sided(self) -> bool {
        matches!(self, MatchPattern::OrderBank)
    }
}

impl fmt::Display for MatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Auto,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    #[serde(rename = "1:1")]
    OneToOne,
    #[serde(rename = "many:1")]
    ManyToOne,
}

impl MatchType {
    pub fn for_linked_count(count: usize) -> Self {
        if count > 1 {
            MatchType::ManyToOne
        } else {
            MatchType::OneToOne
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchType::OneToOne => write!(f, "1:1"),
            MatchType::ManyToOne => write!(f, "many:1"),
        }
    }
}

/// An accepted link between one primary bank transaction and the auxiliary
/// records that settle it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub pattern: MatchPattern,
    pub provenance: Provenance,
    pub confidence: Confidence,
    pub match_type: MatchType,
    pub primary_id: TransactionId,
    pub linked_ids: Vec<TransactionId>,
    /// Absolute amount of the primary transaction.
    pub matched_amount: Money,
    /// Absolute sum of the linked records.
    pub linked_amount: Money,
    /// `matched_amount - linked_amount`.
    pub amount_difference: Money,
    /// Residual the match was accepted under.
    pub tolerance: Money,
    /// Largest distance between the primary date and any linked date.
    pub date_difference_days: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_period: Option<DateRange>,
    /// Both sides become internal transfers when applied.
    #[serde(default)]
    pub internal: bool,
}

impl Match {
    pub fn involves(&self, id: &TransactionId) -> bool {
        &self.primary_id == id || self.linked_ids.contains(id)
    }
}

/// An unresolved lead for a human to confirm. Never mutates transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub pattern: MatchPattern,
    pub primary_id: TransactionId,
    pub candidate_ids: Vec<TransactionId>,
    /// Combined amount and date closeness in [0, 1].
    pub score: f32,
    pub reason: String,
    pub confidence: Confidence,
    pub target_amount: Money,
    pub candidate_amount: Money,
    /// `target_amount - candidate_amount`; positive means a shortfall.
    pub shortfall: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Classified, unclaimed primaries handed to a matcher.
    pub processed: usize,
    pub auto_matched: usize,
    pub suggested: usize,
    /// Primaries skipped because an earlier run already settled them.
    pub already_matched: usize,
    pub unclassified: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub matches: Vec<Match>,
    pub suggestions: Vec<Suggestion>,
    pub stats: RunStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// `date|amount cents|normalized description fragment`.
    pub key: String,
    pub transaction_ids: Vec<TransactionId>,
    pub keep_id: TransactionId,
    pub remove_ids: Vec<TransactionId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub groups: Vec<DuplicateGroup>,
    pub removals: BTreeSet<TransactionId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_type_serializes_as_ratio() {
        assert_eq!(serde_json::to_string(&MatchType::OneToOne).unwrap(), "\"1:1\"");
        assert_eq!(serde_json::to_string(&MatchType::ManyToOne).unwrap(), "\"many:1\"");
        let back: MatchType = serde_json::from_str("\"many:1\"").unwrap();
        assert_eq!(back, MatchType::ManyToOne);
    }

    #[test]
    fn confidence_orders_low_to_high() {
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
    }

    #[test]
    fn match_type_for_count() {
        assert_eq!(MatchType::for_linked_count(1), MatchType::OneToOne);
        assert_eq!(MatchType::for_linked_count(3), MatchType::ManyToOne);
    }

    #[test]
    fn only_orders_are_one_sided() {
        assert!(MatchPattern::OrderBank.is_one_sided());
        assert!(!MatchPattern::TransferBank.is_one_sided());
    }
}
