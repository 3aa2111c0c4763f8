//! Isomorphism oracles
//!
//! The bank never decides isomorphism itself. It writes both graphs as
//! adjacency files and asks an [`IsomorphismOracle`]; the production oracle
//! runs an external checker and reads the first word of its output.

use crate::config::BankConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

const CANDIDATE: &str = "{candidate}";
const EXISTING: &str = "{existing}";

/// Answer from an oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Isomorphic,
    Distinct,
    /// Output that is neither a yes nor a no, kept for the log.
    Ambiguous(String),
}

impl Verdict {
    /// Interpret checker output: a leading `YES` or `NO` word, anything else
    /// (including `NOTE`, `NOT FOUND`) is ambiguous.
    pub fn parse(output: &str) -> Self {
        let output = output.trim_start();
        if leads_with(output, "YES") {
            Verdict::Isomorphic
        } else if leads_with(output, "NO") {
            Verdict::Distinct
        } else {
            Verdict::Ambiguous(output.chars().take(120).collect())
        }
    }
}

/// `word` followed by end of output, whitespace or punctuation.
fn leads_with(output: &str, word: &str) -> bool {
    output
        .strip_prefix(word)
        .map_or(false, |rest| rest.chars().next().map_or(true, |c| !c.is_alphanumeric() && c != '_'))
}

/// Decides whether two adjacency files describe isomorphic graphs.
pub trait IsomorphismOracle: Send + Sync {
    fn compare(&self, candidate: &Path, existing: &Path) -> Result<Verdict>;
}

/// Runs an external checker program once per comparison.
#[derive(Debug, Clone)]
pub struct ExternalOracle {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalOracle {
    /// Fails if `program` is given as a path and nothing exists there.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Result<Self> {
        let program = program.into();
        if program.components().count() > 1 && !program.exists() {
            anyhow::bail!("Isomorphism checker not found: {}", program.display());
        }
        Ok(Self { program, args })
    }

    pub fn from_config(config: &BankConfig) -> Result<Self> {
        Self::new(&config.oracle, config.oracle_args.clone())
    }

    fn command(&self, candidate: &Path, existing: &Path) -> Command {
        let candidate = candidate.to_string_lossy();
        let existing = existing.to_string_lossy();
        let mut cmd = Command::new(&self.program);
        for arg in &self.args {
            cmd.arg(arg.replace(CANDIDATE, &candidate).replace(EXISTING, &existing));
        }
        cmd
    }
}

impl IsomorphismOracle for ExternalOracle {
    fn compare(&self, candidate: &Path, existing: &Path) -> Result<Verdict> {
        let output = self
            .command(candidate, existing)
            .output()
            .with_context(|| format!("Failed to run isomorphism checker: {}", self.program.display()))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            anyhow::bail!(
                "Isomorphism checker exited with {}: {}",
                output.status,
                text.trim()
            );
        }
        Ok(Verdict::parse(&text))
    }
}
