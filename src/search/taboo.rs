//! One parallel taboo-search round
//!
//! The first-edge row index `i` is split into contiguous ranges, one per
//! task. Each task scans its rows on a private copy of the graph: for every
//! `(i, j)` it samples one second edge `(k, l)` of the opposite color, flips
//! both, counts cliques, and flips them back. Tasks report their best
//! non-taboo move over a bounded channel, and a task that reaches zero
//! reports immediately and stops.

use super::{Move, TabooSet};
use crate::graph::Graph;
use crossbeam::channel;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::ops::Range;

/// Sampling attempts per first edge, as a multiple of `size^2`.
const SAMPLE_ATTEMPTS_FACTOR: usize = 4;

/// Result of one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// A move that brings the count to zero.
    Solved(Move),
    /// The best non-taboo move found; its count may be higher than the current one.
    Improved(Move),
    /// No task produced any admissible move.
    Exhausted,
}

/// Parallel round runner.
#[derive(Debug, Clone)]
pub struct TabooSearch {
    tasks: usize,
}

impl TabooSearch {
    pub fn new(tasks: usize) -> Self {
        Self {
            tasks: tasks.max(1),
        }
    }

    pub fn tasks(&self) -> usize {
        self.tasks
    }

    /// Score candidate moves on `graph` and return the best one not in `taboo`.
    ///
    /// Ties on count are broken by the smaller move key, so the result does
    /// not depend on which task finished first.
    pub fn round<R: Rng + ?Sized>(
        &self,
        graph: &Graph,
        taboo: &TabooSet,
        rng: &mut R,
    ) -> RoundOutcome {
        let ranges = partition(graph.size(), self.tasks);
        if ranges.is_empty() {
            return RoundOutcome::Exhausted;
        }
        let seeds: Vec<u64> = ranges.iter().map(|_| rng.gen()).collect();

        let (tx, rx) = channel::bounded(ranges.len());
        let scoped = crossbeam::thread::scope(|s| {
            for (range, &seed) in ranges.iter().zip(&seeds) {
                let tx = tx.clone();
                let range = range.clone();
                s.spawn(move |_| {
                    let best = scan_rows(graph, taboo, range, seed);
                    // Receiver outlives the scope
                    let _ = tx.send(best);
                });
            }
        });
        if let Err(panic) = scoped {
            std::panic::resume_unwind(panic);
        }
        drop(tx);

        let best = rx
            .iter()
            .flatten()
            .min_by_key(|mv: &Move| (mv.count(), mv.key()));

        match best {
            Some(mv) if mv.count() == 0 => RoundOutcome::Solved(mv),
            Some(mv) => RoundOutcome::Improved(mv),
            None => RoundOutcome::Exhausted,
        }
    }
}

/// Split `0..size` into at most `tasks` contiguous, non-empty ranges whose
/// lengths differ by at most one.
pub fn partition(size: usize, tasks: usize) -> Vec<Range<usize>> {
    let tasks = tasks.max(1);
    let base = size / tasks;
    let extra = size % tasks;

    let mut ranges = Vec::with_capacity(tasks);
    let mut start = 0;
    for t in 0..tasks {
        let len = base + usize::from(t < extra);
        if len == 0 {
            break;
        }
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

fn scan_rows(base: &Graph, taboo: &TabooSet, rows: Range<usize>, seed: u64) -> Option<Move> {
    let n = base.size();
    if n < 3 {
        return None;
    }
    let mut graph = base.clone();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let attempts = SAMPLE_ATTEMPTS_FACTOR * n * n;
    let mut best: Option<Move> = None;

    for i in rows {
        for j in i + 1..n {
            let Some((k, l)) = sample_opposite(&graph, (i, j), attempts, &mut rng) else {
                continue;
            };

            graph.flip(i, j);
            graph.flip(k, l);
            let count = graph.clique_count();
            graph.flip(i, j);
            graph.flip(k, l);

            let mv = Move::new((i, j), (k, l), count);
            if taboo.contains(&mv.key()) {
                continue;
            }
            if best.map_or(true, |b| (count, mv.key()) < (b.count(), b.key())) {
                best = Some(mv);
            }
            if count == 0 {
                return best;
            }
        }
    }
    best
}

/// Pick `(k, l)` with `k != i`, `k < l`, whose color differs from `(i, j)`.
fn sample_opposite<R: Rng>(
    graph: &Graph,
    (i, j): (usize, usize),
    attempts: usize,
    rng: &mut R,
) -> Option<(usize, usize)> {
    let n = graph.size();
    let color = graph.edge(i, j);
    for _ in 0..attempts {
        // k ranges over 0..=n-2 without i
        let mut k = rng.gen_range(0..n - 2);
        if k >= i {
            k += 1;
        }
        let l = rng.gen_range(k + 1..n);
        if graph.edge(k, l) != color {
            return Some((k, l));
        }
    }
    None
}
