pub mod apply;
pub mod claims;
pub mod classifier;
pub mod config;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod manual;
pub mod matcher;
pub mod model;
pub mod resolver;
pub mod selector;
pub mod strategy;
pub(crate) mod text;

pub use apply::{apply_removals, apply_updates, plan_updates, unlink_updates, TransactionUpdate};
pub use claims::ClaimSet;
pub use classifier::{PatternClassifier, SourceClass};
pub use config::{ConfigError, MatchConfig};
pub use engine::ReconciliationEngine;
pub use error::MatchError;
pub use model::{
    Confidence, DuplicateGroup, DuplicateReport, Match, MatchPattern, MatchType, Provenance,
    RunReport, RunStats, Suggestion,
};
pub use strategy::Strategy;

pub mod reconcile {
    use crate::*;
    use tally_core::Snapshot;

    pub fn run_all_matchers(
        config: MatchConfig,
        snapshot: &Snapshot,
        existing: &[Match],
    ) -> Result<RunReport, ConfigError> {
        Ok(ReconciliationEngine::new(config)?.run(snapshot, existing))
    }

    pub fn run_duplicate_detection(
        config: MatchConfig,
        snapshot: &Snapshot,
    ) -> Result<DuplicateReport, ConfigError> {
        Ok(ReconciliationEngine::new(config)?.detect_duplicates(snapshot))
    }
}
