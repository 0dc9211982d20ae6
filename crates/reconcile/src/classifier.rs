use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use tally_core::{Feed, Transaction};

use crate::config::{ConfigError, PatternConfig};

/// Where a bank charge most likely originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceClass {
    Processor,
    CardIssuer,
    TransferPartner,
    Merchant,
}

impl SourceClass {
    /// The auxiliary feed whose records settle charges of this class.
    pub fn feed(self) -> Feed {
        match self {
            SourceClass::Processor => Feed::Processor,
            SourceClass::CardIssuer => Feed::Card,
            SourceClass::TransferPartner => Feed::Transfer,
            SourceClass::Merchant => Feed::OrderHistory,
        }
    }
}

impl fmt::Display for SourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceClass::Processor => write!(f, "processor"),
            SourceClass::CardIssuer => write!(f, "card_issuer"),
            SourceClass::TransferPartner => write!(f, "transfer_partner"),
            SourceClass::Merchant => write!(f, "merchant"),
        }
    }
}

/// A pattern paired with the class it votes for.
struct CompiledPattern {
    class: SourceClass,
    regex: Regex,
}

pub struct PatternClassifier {
    patterns: Vec<CompiledPattern>,
}

impl PatternClassifier {
    pub fn new(config: &PatternConfig) -> Result<Self, ConfigError> {
        let groups = [
            (SourceClass::Processor, &config.processor),
            (SourceClass::CardIssuer, &config.card),
            (SourceClass::TransferPartner, &config.transfer),
            (SourceClass::Merchant, &config.merchant),
        ];

        let mut patterns = Vec::new();
        for (class, sources) in groups {
            for pattern in sources {
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| ConfigError::InvalidPattern {
                        pattern: pattern.clone(),
                        source,
                    })?;
                patterns.push(CompiledPattern { class, regex });
            }
        }
        Ok(Self { patterns })
    }

    /// Returns the single class whose patterns hit the text. Text hitting
    /// several classes, or none, is left unclassified.
    pub fn classify_text(&self, text: &str) -> Option<SourceClass> {
        let mut found: Option<SourceClass> = None;
        for cp in self.patterns.iter().filter(|cp| cp.regex.is_match(text)) {
            match found {
                None => found = Some(cp.class),
                Some(class) if class == cp.class => {}
                Some(_) => return None,
            }
        }
        found
    }

    pub fn classify(&self, tx: &Transaction) -> Option<SourceClass> {
        self.classify_text(&tx.search_text())
    }
}

impl fmt::Debug for PatternClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternClassifier")
            .field("patterns", &self.patterns.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PatternClassifier {
        PatternClassifier::new(&PatternConfig::default()).unwrap()
    }

    #[test]
    fn processor_case_insensitive() {
        let c = classifier();
        assert_eq!(
            c.classify_text("PAYPAL *SPOTIFY 35314369001"),
            Some(SourceClass::Processor)
        );
        assert_eq!(c.classify_text("pp.8842.pp paypal"), Some(SourceClass::Processor));
    }

    #[test]
    fn card_issuer() {
        let c = classifier();
        assert_eq!(
            c.classify_text("AMEX Lastschrift 03/2024"),
            Some(SourceClass::CardIssuer)
        );
        assert_eq!(
            c.classify_text("Kreditkartenabrechnung"),
            Some(SourceClass::CardIssuer)
        );
    }

    #[test]
    fn word_boundaries_respected() {
        // "amex" inside another word is not a card issuer
        assert_eq!(classifier().classify_text("CAMEXICO TACOS"), None);
    }

    #[test]
    fn transfer_partner() {
        assert_eq!(
            classifier().classify_text("Transfer to Savings 4411"),
            Some(SourceClass::TransferPartner)
        );
    }

    #[test]
    fn unmatched_text_is_unclassified() {
        assert_eq!(classifier().classify_text("REWE SAGT DANKE"), None);
    }

    #[test]
    fn ambiguous_text_is_unclassified() {
        // hits both processor and merchant
        assert_eq!(classifier().classify_text("AMAZON via PAYPAL"), None);
    }

    #[test]
    fn several_hits_of_one_class_still_classify() {
        assert_eq!(
            classifier().classify_text("PAYPAL STRIPE"),
            Some(SourceClass::Processor)
        );
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let config = PatternConfig {
            processor: vec!["(unclosed".to_string()],
            ..PatternConfig::default()
        };
        let err = PatternClassifier::new(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));
    }

    #[test]
    fn class_feeds() {
        assert_eq!(SourceClass::CardIssuer.feed(), Feed::Card);
        assert_eq!(SourceClass::Merchant.feed(), Feed::OrderHistory);
    }
}
