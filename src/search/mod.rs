//! Taboo search over edge-pair swaps
//!
//! A [`Move`] recolors two edges of opposite color at once, which keeps the
//! number of ones in the graph constant. Moves already applied at the current
//! size are recorded in a [`TabooSet`] and never proposed again until the
//! graph grows.
//!
//! - [`taboo`]: one parallel round that scores every candidate move
//! - [`driver`]: the loop that applies moves, backtracks, and grows the graph

pub mod driver;
pub mod taboo;

pub use driver::{SearchDriver, StepEvent};
pub use taboo::{RoundOutcome, TabooSearch};

use std::collections::HashSet;

/// Coordinates of a move, canonicalized so the same pair of edges always
/// produces the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MoveKey {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub l: usize,
}

/// A pair of edge flips together with the clique count they produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    key: MoveKey,
    count: u64,
}

impl Move {
    pub fn new(first: (usize, usize), second: (usize, usize), count: u64) -> Self {
        let a = ordered(first);
        let b = ordered(second);
        let ((i, j), (k, l)) = if a <= b { (a, b) } else { (b, a) };
        Self {
            key: MoveKey { i, j, k, l },
            count,
        }
    }

    pub fn key(&self) -> MoveKey {
        self.key
    }

    /// Clique count of the graph with this move applied.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn edges(&self) -> [(usize, usize); 2] {
        [(self.key.i, self.key.j), (self.key.k, self.key.l)]
    }
}

fn ordered((a, b): (usize, usize)) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Moves already applied at one graph size.
#[derive(Debug, Clone, Default)]
pub struct TabooSet {
    size: usize,
    moves: HashSet<MoveKey>,
}

impl TabooSet {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            moves: HashSet::new(),
        }
    }

    /// Graph size this set belongs to.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn contains(&self, key: &MoveKey) -> bool {
        self.moves.contains(key)
    }

    /// Returns false if the move was already taboo.
    pub fn insert(&mut self, key: MoveKey) -> bool {
        self.moves.insert(key)
    }

    /// Forget everything and start a new epoch for `size`.
    pub fn reset(&mut self, size: usize) {
        self.size = size;
        self.moves.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_is_canonical() {
        let a = Move::new((3, 1), (0, 5), 7);
        let b = Move::new((0, 5), (1, 3), 7);
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key(), MoveKey { i: 0, j: 5, k: 1, l: 3 });
        assert_eq!(a.edges(), [(0, 5), (1, 3)]);
        assert_eq!(a.count(), 7);
    }

    #[test]
    fn test_taboo_ignores_count() {
        let mut taboo = TabooSet::new(11);
        assert!(taboo.insert(Move::new((0, 1), (2, 3), 9).key()));
        assert!(!taboo.insert(Move::new((2, 3), (1, 0), 4).key()));
        assert!(taboo.contains(&Move::new((3, 2), (0, 1), 0).key()));
        assert_eq!(taboo.len(), 1);
    }

    #[test]
    fn test_taboo_reset_starts_new_epoch() {
        let mut taboo = TabooSet::new(11);
        taboo.insert(Move::new((0, 1), (2, 3), 1).key());
        taboo.reset(13);
        assert!(taboo.is_empty());
        assert_eq!(taboo.size(), 13);
    }
}
