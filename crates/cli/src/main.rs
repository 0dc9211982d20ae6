//! `tally`: reconcile a JSON transaction snapshot from the command line.
//!
//! Reports go to stdout as JSON; logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tally_core::{Snapshot, TransactionRecord};
use tally_reconcile::{apply_removals, apply_updates, plan_updates, Match, MatchConfig, ReconciliationEngine};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tally", version, about = "Multi-source transaction reconciliation")]
struct Cli {
    /// Matching config (TOML). Defaults apply when omitted.
    #[arg(long, global = true, env = "TALLY_CONFIG")]
    config: Option<PathBuf>,

    /// Single-line JSON instead of pretty-printed
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every matcher and print matches, suggestions and stats
    #[command(after_help = "\
Examples:
  tally match snapshot.json
  tally match snapshot.json --matches accepted.json --config tally.toml")]
    Match {
        /// Snapshot of transactions (JSON array)
        snapshot: PathBuf,

        /// Matches accepted in earlier runs (JSON array)
        #[arg(long)]
        matches: Option<PathBuf>,
    },

    /// Group likely re-imported bank transactions
    #[command(after_help = "\
Examples:
  tally duplicates snapshot.json")]
    Duplicates {
        /// Snapshot of transactions (JSON array)
        snapshot: PathBuf,
    },

    /// Print the snapshot with match linkage written back
    #[command(after_help = "\
Examples:
  tally apply snapshot.json
  tally apply snapshot.json --matches reviewed.json --drop-duplicates")]
    Apply {
        /// Snapshot of transactions (JSON array)
        snapshot: PathBuf,

        /// Apply these matches instead of running the matchers
        #[arg(long)]
        matches: Option<PathBuf>,

        /// Also drop the copies the duplicate scan recommends removing
        #[arg(long)]
        drop_duplicates: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let engine = ReconciliationEngine::new(config).context("invalid matching config")?;

    match cli.command {
        Commands::Match { snapshot, matches } => {
            let snapshot = load_snapshot(&snapshot)?;
            let existing = match matches {
                Some(path) => load_matches(&path)?,
                None => Vec::new(),
            };
            let report = engine.run(&snapshot, &existing);
            print_json(&report, cli.compact)
        }
        Commands::Duplicates { snapshot } => {
            let snapshot = load_snapshot(&snapshot)?;
            print_json(&engine.detect_duplicates(&snapshot), cli.compact)
        }
        Commands::Apply {
            snapshot,
            matches,
            drop_duplicates,
        } => {
            let snapshot = load_snapshot(&snapshot)?;
            let matches = match matches {
                Some(path) => load_matches(&path)?,
                None => engine.run(&snapshot, &[]).matches,
            };
            let updates = plan_updates(&snapshot, &matches).context("cannot apply matches")?;
            let removals = drop_duplicates.then(|| engine.detect_duplicates(&snapshot).removals);

            let mut transactions = snapshot.into_transactions();
            let updated = apply_updates(&mut transactions, &updates).context("cannot apply matches")?;
            tracing::info!("updated {} transactions from {} matches", updated, matches.len());
            if let Some(removals) = removals {
                tracing::info!("dropping {} duplicate transactions", removals.len());
                transactions = apply_removals(transactions, &removals);
            }
            print_json(&transactions, cli.compact)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<MatchConfig> {
    match path {
        Some(path) => MatchConfig::from_path(path)
            .with_context(|| format!("cannot load config {}", path.display())),
        None => Ok(MatchConfig::default()),
    }
}

fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read snapshot {}", path.display()))?;
    let records: Vec<TransactionRecord> = serde_json::from_str(&data)
        .with_context(|| format!("cannot parse snapshot {}", path.display()))?;
    let snapshot = Snapshot::from_records(records)
        .with_context(|| format!("invalid snapshot {}", path.display()))?;
    tracing::info!("loaded {} transactions from {}", snapshot.len(), path.display());
    Ok(snapshot)
}

fn load_matches(path: &Path) -> Result<Vec<Match>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read matches {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("cannot parse matches {}", path.display()))
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_match_with_existing_matches() {
        let cli = Cli::try_parse_from([
            "tally",
            "match",
            "snap.json",
            "--matches",
            "accepted.json",
            "--config",
            "tally.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("tally.toml")));
        assert!(!cli.compact);
        match cli.command {
            Commands::Match { snapshot, matches } => {
                assert_eq!(snapshot, PathBuf::from("snap.json"));
                assert_eq!(matches, Some(PathBuf::from("accepted.json")));
            }
            _ => panic!("expected match command"),
        }
    }

    #[test]
    fn parses_apply_flags() {
        let cli = Cli::try_parse_from(["tally", "--compact", "apply", "snap.json", "--drop-duplicates"]).unwrap();
        assert!(cli.compact);
        assert!(matches!(
            cli.command,
            Commands::Apply {
                matches: None,
                drop_duplicates: true,
                ..
            }
        ));
    }

    #[test]
    fn snapshot_is_required() {
        assert!(Cli::try_parse_from(["tally", "duplicates"]).is_err());
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(Cli::try_parse_from(["tally", "import", "x.csv"]).is_err());
    }

    #[test]
    fn missing_config_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, MatchConfig::default());
    }
}
