//! Solution bank
//!
//! Keeps one representative of every isomorphism class of counterexample
//! seen so far, bucketed by size. Each accepted graph (a [`Coin`]) is named
//! `<size>_<position>.adj` and written to the bank directory in adjacency
//! text form so the external checker can read it. The bank itself is
//! persisted with bincode after every acceptance and rehydrated on open.
//!
//! A candidate is accepted only if the oracle positively says it is distinct
//! from every coin of the same size. Oracle errors and unreadable answers
//! count as duplicates.

pub mod oracle;

pub use oracle::{ExternalOracle, IsomorphismOracle, Verdict};

use crate::config::BankConfig;
use crate::graph::text::write_adjacency_file;
use crate::graph::Graph;
use crate::util::persist::{load_state, save_state};
use crate::Result;
use anyhow::Context;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// An accepted counterexample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub name: String,
    pub graph: Graph,
}

/// File name for the coin at `position` in the `size` bucket.
pub fn coin_name(size: usize, position: usize) -> String {
    format!("{size}_{position}.adj")
}

pub struct SolutionBank<O> {
    buckets: BTreeMap<usize, Vec<Coin>>,
    dir: PathBuf,
    state_path: PathBuf,
    oracle: O,
}

impl SolutionBank<ExternalOracle> {
    /// Open the bank described by `config`, using the external checker.
    pub fn from_config(config: &BankConfig) -> Result<Self> {
        let oracle = ExternalOracle::from_config(config)?;
        Self::open(&config.dir, config.state_path(), oracle)
    }
}

impl<O: IsomorphismOracle> SolutionBank<O> {
    /// Load the bank state (empty if absent) and rewrite every coin's file.
    pub fn open(dir: impl Into<PathBuf>, state_path: impl Into<PathBuf>, oracle: O) -> Result<Self> {
        let dir = dir.into();
        let state_path = state_path.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create bank directory: {}", dir.display()))?;

        let buckets: BTreeMap<usize, Vec<Coin>> = load_state(&state_path)?.unwrap_or_default();
        let bank = Self {
            buckets,
            dir,
            state_path,
            oracle,
        };

        let failures = bank.externalize_all();
        if failures > 0 {
            warn!(failures, dir = %bank.dir.display(), "Some bank files could not be written");
        }
        info!(
            coins = bank.len(),
            sizes = bank.buckets.len(),
            state = %bank.state_path.display(),
            "Solution bank opened"
        );
        Ok(bank)
    }

    /// Offer a counterexample. Returns whether it was accepted.
    ///
    /// Persistence failures are errors; everything else that goes wrong with
    /// a candidate just rejects it.
    pub fn add_coin(&mut self, graph: &Graph) -> Result<bool> {
        if let Err(e) = graph.validate() {
            warn!(error = %e, "Rejecting malformed graph");
            return Ok(false);
        }
        if graph.is_empty() {
            return Ok(false);
        }

        let size = graph.size();
        let position = self.bucket(size).len();
        let name = coin_name(size, position);
        let scratch = self.dir.join(format!(".{name}.candidate"));

        if let Err(e) = write_adjacency_file(&scratch, graph) {
            warn!(error = %format!("{e:#}"), "Could not stage candidate, rejecting");
            return Ok(false);
        }

        if self.matches_existing(&scratch, size) {
            if let Err(e) = fs::remove_file(&scratch) {
                debug!(error = %e, path = %scratch.display(), "Could not remove candidate file");
            }
            return Ok(false);
        }

        let path = self.dir.join(&name);
        fs::rename(&scratch, &path)
            .with_context(|| format!("Failed to move candidate into bank: {}", path.display()))?;

        self.buckets.entry(size).or_default().push(Coin {
            name: name.clone(),
            graph: graph.clone(),
        });
        self.save()?;

        info!(coin = %name, size, "Accepted new counterexample class");
        Ok(true)
    }

    /// Offer every graph reachable from `graph` by deleting up to `levels`
    /// vertices. Returns how many were accepted.
    pub fn harvest(&mut self, graph: &Graph, levels: usize) -> Result<usize> {
        let mut frontier = vec![graph.clone()];
        let mut accepted = 0;

        for level in 1..=levels {
            let mut next = Vec::new();
            for parent in &frontier {
                for v in 0..parent.size() {
                    let child = parent.without_vertex(v)?;
                    if self.add_coin(&child)? {
                        accepted += 1;
                    }
                    if level < levels {
                        next.push(child);
                    }
                }
            }
            debug!(level, offered = frontier.iter().map(Graph::size).sum::<usize>(), "Harvest level done");
            frontier = next;
        }

        if accepted > 0 {
            info!(accepted, from_size = graph.size(), levels, "Harvested smaller counterexamples");
        }
        Ok(accepted)
    }

    pub fn bucket(&self, size: usize) -> &[Coin] {
        self.buckets.get(&size).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sizes with at least one coin, with their counts.
    pub fn summary(&self) -> Vec<(usize, usize)> {
        self.buckets
            .iter()
            .map(|(&size, coins)| (size, coins.len()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save(&self) -> Result<()> {
        save_state(&self.state_path, &self.buckets).context("Failed to persist solution bank")
    }

    fn matches_existing(&self, candidate: &Path, size: usize) -> bool {
        for coin in self.bucket(size) {
            let existing = self.dir.join(&coin.name);
            match self.oracle.compare(candidate, &existing) {
                Ok(Verdict::Distinct) => continue,
                Ok(Verdict::Isomorphic) => {
                    debug!(coin = %coin.name, "Candidate is isomorphic to existing coin");
                    return true;
                }
                Ok(Verdict::Ambiguous(output)) => {
                    warn!(coin = %coin.name, output = %output, "Unreadable checker answer, rejecting candidate");
                    return true;
                }
                Err(e) => {
                    warn!(coin = %coin.name, error = %format!("{e:#}"), "Checker failed, rejecting candidate");
                    return true;
                }
            }
        }
        false
    }

    fn externalize_all(&self) -> usize {
        self.buckets
            .values()
            .flatten()
            .collect::<Vec<_>>()
            .par_iter()
            .filter(|coin| {
                let path = self.dir.join(&coin.name);
                match write_adjacency_file(&path, &coin.graph) {
                    Ok(()) => false,
                    Err(e) => {
                        warn!(error = %format!("{e:#}"), "Failed to externalize coin");
                        true
                    }
                }
            })
            .count()
    }
}
