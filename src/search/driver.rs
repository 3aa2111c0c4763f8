//! Search driver
//!
//! Owns the working graph and everything needed to continue searching from
//! it: the checkpoint to fall back to, the taboo set for the current size,
//! the sequence of odd-prime growth targets, and the RNG. The driver is
//! synchronous; callers decide what to do with each [`StepEvent`].

use super::taboo::{RoundOutcome, TabooSearch};
use super::TabooSet;
use crate::config::SearchConfig;
use crate::graph::primes::{next_odd_prime, OddPrimes};
use crate::graph::Graph;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// What one call to [`SearchDriver::step`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepEvent {
    /// The current graph has no monochromatic 6-clique. The driver stays on
    /// it until [`SearchDriver::advance`] or [`SearchDriver::adopt`] is called.
    CounterExample(Graph),
    /// A move was applied.
    Moved { size: usize, from: u64, to: u64 },
    /// Every move was taboo or unavailable; the graph was rebuilt from the
    /// checkpoint with a fresh last column.
    Reverted { size: usize },
    /// The graph has grown past the configured maximum size.
    Finished { size: usize },
}

pub struct SearchDriver {
    graph: Graph,
    checkpoint: Graph,
    count: Option<u64>,
    taboo: TabooSet,
    search: TabooSearch,
    targets: OddPrimes,
    rng: Xoshiro256PlusPlus,
    max_size: Option<usize>,
    rounds: u64,
}

impl SearchDriver {
    /// Resume searching on `graph` at its current size.
    pub fn new(graph: Graph, config: &SearchConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };
        Self {
            checkpoint: graph.clone(),
            count: None,
            taboo: TabooSet::new(graph.size()),
            search: TabooSearch::new(config.tasks),
            targets: OddPrimes::after(graph.size()),
            rng,
            max_size: config.max_size,
            rounds: 0,
            graph,
        }
    }

    /// Start from a random balanced graph of `start_size` vertices, grown to
    /// the first odd-prime target.
    pub fn fresh(config: &SearchConfig) -> Self {
        let mut driver = Self::new(Graph::empty(), config);
        let graph = Graph::new_balanced(config.start_size, &mut driver.rng);
        driver.adopt(graph);
        driver
    }

    /// Continue from a known counterexample: grow it to the next target.
    pub fn from_counterexample(graph: Graph, config: &SearchConfig) -> Self {
        let mut driver = Self::new(graph, config);
        driver.advance();
        driver
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn size(&self) -> usize {
        self.graph.size()
    }

    /// Clique count of the current graph, if already known.
    pub fn count(&self) -> Option<u64> {
        self.count
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn taboo_len(&self) -> usize {
        self.taboo.len()
    }

    /// Run one round of the search.
    pub fn step(&mut self) -> StepEvent {
        let size = self.graph.size();
        if self.max_size.map_or(false, |max| size > max) {
            return StepEvent::Finished { size };
        }

        let count = match self.count {
            Some(count) => count,
            None => {
                let count = self.graph.clique_count();
                self.count = Some(count);
                count
            }
        };
        if count == 0 {
            return StepEvent::CounterExample(self.graph.clone());
        }

        self.rounds += 1;
        match self.search.round(&self.graph, &self.taboo, &mut self.rng) {
            RoundOutcome::Solved(mv) | RoundOutcome::Improved(mv) => {
                for (a, b) in mv.edges() {
                    self.graph.flip(a, b);
                }
                self.taboo.insert(mv.key());
                self.count = Some(mv.count());
                StepEvent::Moved {
                    size,
                    from: count,
                    to: mv.count(),
                }
            }
            RoundOutcome::Exhausted => self.revert(),
        }
    }

    /// Grow vertex by vertex to the next odd-prime target, checkpointing
    /// before each added vertex. Returns the new size.
    pub fn advance(&mut self) -> usize {
        let size = self.graph.size();
        let target = self
            .targets
            .find(|&p| p > size)
            .unwrap_or_else(|| next_odd_prime(size));

        while self.graph.size() < target {
            self.checkpoint = self.graph.clone();
            self.graph.grow(&mut self.rng);
        }
        self.taboo.reset(target);
        self.count = None;
        target
    }

    /// Replace the working graph with a counterexample from elsewhere and
    /// grow it to its next target. Returns the new size.
    pub fn adopt(&mut self, graph: Graph) -> usize {
        self.targets = OddPrimes::after(graph.size());
        self.checkpoint = graph.clone();
        self.graph = graph;
        self.advance()
    }

    fn revert(&mut self) -> StepEvent {
        self.graph = self.checkpoint.clone();
        self.graph.grow(&mut self.rng);
        self.taboo.reset(self.graph.size());
        self.count = None;
        StepEvent::Reverted {
            size: self.graph.size(),
        }
    }
}
