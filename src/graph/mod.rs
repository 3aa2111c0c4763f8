//! Two-colored complete graphs
//!
//! A [`Graph`] is a complete graph on `size` vertices whose edges are colored
//! 0 or 1. Colors live in a flat `size * size` row-major buffer, but only the
//! strict upper triangle (`row < col`) is meaningful: every accessor
//! normalizes its coordinates to `(min, max)`. Graphs built by this crate keep
//! the lower triangle and diagonal zeroed; graphs received from elsewhere may
//! carry anything there and it is ignored.
//!
//! The quantity every other module cares about is [`Graph::clique_count`], the
//! number of monochromatic 6-cliques. A graph whose count is zero is a
//! counterexample for R(6,6).
//!
//! # Wire format
//!
//! The serde field names (`G`, `Size`, `Parity`) are shared by the sync
//! protocol and the durable state files.

pub mod primes;
pub mod text;

use crate::util::persist::load_state;
use anyhow::Context;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Order of the monochromatic cliques being avoided.
pub const CLIQUE_SIZE: usize = 6;

/// Structural problems with a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("graph of size {size} must hold size^2 edge values, got {len}")]
    ShapeMismatch { size: usize, len: usize },

    #[error("edge value at index {index} is {value}, expected 0 or 1")]
    InvalidValue { index: usize, value: u8 },

    #[error("vertex {vertex} is out of range for a graph of size {size}")]
    VertexOutOfRange { vertex: usize, size: usize },

    #[error("invalid adjacency text: {0}")]
    Parse(String),
}

/// A two-colored complete graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(rename = "G")]
    edges: Vec<u8>,
    #[serde(rename = "Size")]
    size: usize,
    /// Parity of the zero/one imbalance in the upper triangle. Growth reads
    /// it to keep the coloring as balanced as possible.
    #[serde(rename = "Parity", default)]
    parity: u8,
}

/// Number of cells strictly above the diagonal.
pub fn upper_triangle_cells(size: usize) -> usize {
    size * size.saturating_sub(1) / 2
}

impl Graph {
    /// The size-0 graph, used on the wire to mean "nothing to report".
    pub fn empty() -> Self {
        Self::default()
    }

    /// All-zero graph of the given size.
    pub fn zeroed(size: usize) -> Self {
        Self {
            edges: vec![0; size * size],
            size,
            parity: (upper_triangle_cells(size) % 2) as u8,
        }
    }

    /// Build a graph from a raw row-major buffer, validating its shape and values.
    pub fn from_edges(size: usize, edges: Vec<u8>) -> Result<Self, GraphError> {
        let graph = Self {
            edges,
            size,
            parity: (upper_triangle_cells(size) % 2) as u8,
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Random graph with `floor(T/2)` ones among the `T` upper-triangle cells.
    pub fn new_balanced<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Self {
        let cells = upper_triangle_cells(size);
        let mut colors = vec![0u8; cells];
        colors[..cells / 2].fill(1);
        colors.shuffle(rng);

        let mut graph = Self::zeroed(size);
        let mut colors = colors.into_iter();
        for row in 0..size {
            for col in row + 1..size {
                if let Some(color) = colors.next() {
                    graph.edges[row * size + col] = color;
                }
            }
        }
        graph
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn parity(&self) -> u8 {
        self.parity
    }

    /// Raw row-major edge buffer.
    pub fn edges(&self) -> &[u8] {
        &self.edges
    }

    /// Check `size^2 == len` and that every value is 0 or 1.
    pub fn validate(&self) -> Result<(), GraphError> {
        let expected = self.size.checked_mul(self.size);
        if expected != Some(self.edges.len()) {
            return Err(GraphError::ShapeMismatch {
                size: self.size,
                len: self.edges.len(),
            });
        }
        if let Some((index, &value)) = self.edges.iter().enumerate().find(|&(_, &v)| v > 1) {
            return Err(GraphError::InvalidValue { index, value });
        }
        Ok(())
    }

    /// Color of the edge between `a` and `b`. Order of the endpoints does not matter.
    #[inline]
    pub fn edge(&self, a: usize, b: usize) -> u8 {
        let (row, col) = if a < b { (a, b) } else { (b, a) };
        self.edges[row * self.size + col]
    }

    #[inline]
    pub fn set_edge(&mut self, a: usize, b: usize, color: u8) {
        let (row, col) = if a < b { (a, b) } else { (b, a) };
        self.edges[row * self.size + col] = color;
    }

    /// Toggle the color of the edge between `a` and `b`.
    #[inline]
    pub fn flip(&mut self, a: usize, b: usize) {
        let (row, col) = if a < b { (a, b) } else { (b, a) };
        self.edges[row * self.size + col] ^= 1;
    }

    /// Number of color-1 edges in the upper triangle.
    pub fn ones(&self) -> usize {
        (0..self.size)
            .map(|row| {
                let start = row * self.size;
                self.edges[start + row + 1..start + self.size]
                    .iter()
                    .filter(|&&v| v == 1)
                    .count()
            })
            .sum()
    }

    /// Add one vertex, connecting it to every existing vertex.
    ///
    /// The new column gets `floor(s/2)` ones (plus one more when the graph
    /// is already short a one and `s` is odd) in random positions.
    pub fn grow<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let old = self.size;
        let size = old + 1;

        let mut edges = vec![0u8; size * size];
        for row in 0..old {
            edges[row * size..row * size + old]
                .copy_from_slice(&self.edges[row * old..row * old + old]);
        }

        let mut ones = old / 2;
        if self.parity == 1 && old % 2 == 1 {
            ones += 1;
        }
        let mut column = vec![0u8; old];
        column[..ones].fill(1);
        column.shuffle(rng);
        for (row, color) in column.into_iter().enumerate() {
            edges[row * size + old] = color;
        }

        if old % 2 == 1 {
            self.parity ^= 1;
        }
        self.edges = edges;
        self.size = size;
    }

    /// Copy of the graph with vertex `v` removed.
    pub fn without_vertex(&self, v: usize) -> Result<Graph, GraphError> {
        if v >= self.size {
            return Err(GraphError::VertexOutOfRange {
                vertex: v,
                size: self.size,
            });
        }
        let mut graph = Graph::zeroed(self.size - 1);
        let keep: Vec<usize> = (0..self.size).filter(|&u| u != v).collect();
        for (row, &a) in keep.iter().enumerate() {
            for (col, &b) in keep.iter().enumerate().skip(row + 1) {
                graph.edges[row * graph.size + col] = self.edge(a, b);
            }
        }
        Ok(graph)
    }

    /// Relabel vertices: old vertex `v` becomes `order[v]`.
    ///
    /// `order` must be a permutation of `0..size`.
    pub fn relabeled(&self, order: &[usize]) -> Result<Graph, GraphError> {
        if order.len() != self.size {
            return Err(GraphError::ShapeMismatch {
                size: self.size,
                len: order.len(),
            });
        }
        if let Some(&vertex) = order.iter().find(|&&v| v >= self.size) {
            return Err(GraphError::VertexOutOfRange {
                vertex,
                size: self.size,
            });
        }
        let mut graph = Graph::zeroed(self.size);
        graph.parity = self.parity;
        for a in 0..self.size {
            for b in a + 1..self.size {
                graph.set_edge(order[a], order[b], self.edge(a, b));
            }
        }
        Ok(graph)
    }

    /// Count monochromatic 6-cliques.
    ///
    /// Six nested scans over `a < b < c < d < e < f`, each level pruned as
    /// soon as one of its edges to an earlier vertex breaks the color set by
    /// `(a, b)`. Allocation-free.
    pub fn clique_count(&self) -> u64 {
        let n = self.size;
        if n < CLIQUE_SIZE {
            return 0;
        }
        let g = &self.edges;
        let mut count = 0u64;

        for a in 0..n - 5 {
            let ra = a * n;
            for b in a + 1..n - 4 {
                let color = g[ra + b];
                let rb = b * n;
                for c in b + 1..n - 3 {
                    if g[ra + c] != color || g[rb + c] != color {
                        continue;
                    }
                    let rc = c * n;
                    for d in c + 1..n - 2 {
                        if g[ra + d] != color || g[rb + d] != color || g[rc + d] != color {
                            continue;
                        }
                        let rd = d * n;
                        for e in d + 1..n - 1 {
                            if g[ra + e] != color
                                || g[rb + e] != color
                                || g[rc + e] != color
                                || g[rd + e] != color
                            {
                                continue;
                            }
                            let re = e * n;
                            for f in e + 1..n {
                                if g[ra + f] == color
                                    && g[rb + f] == color
                                    && g[rc + f] == color
                                    && g[rd + f] == color
                                    && g[re + f] == color
                                {
                                    count += 1;
                                }
                            }
                        }
                    }
                }
            }
        }
        count
    }

    /// True when the graph has no monochromatic 6-clique.
    pub fn is_counterexample(&self) -> bool {
        self.clique_count() == 0
    }
}

/// Read a graph from either a bincode state file or adjacency text.
pub fn read_graph_file(path: &Path) -> crate::Result<Graph> {
    if let Ok(Some(graph)) = load_state::<Graph>(path) {
        if graph.validate().is_ok() {
            return Ok(graph);
        }
    }
    text::read_adjacency_file(path)
        .with_context(|| format!("{} is neither a graph state file nor adjacency text", path.display()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    /// Paley graph on 17 vertices: no monochromatic K4, so no 6-clique either.
    pub(crate) fn paley17() -> Graph {
        const RESIDUES: [usize; 8] = [1, 2, 4, 8, 9, 13, 15, 16];
        let mut graph = Graph::zeroed(17);
        for a in 0..17 {
            for b in a + 1..17 {
                if RESIDUES.contains(&((b - a) % 17)) {
                    graph.set_edge(a, b, 1);
                }
            }
        }
        graph
    }

    fn rng(seed: u64) -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(seed)
    }

    #[test]
    fn test_small_graphs_have_no_cliques() {
        for size in 0..CLIQUE_SIZE {
            assert_eq!(Graph::zeroed(size).clique_count(), 0);
        }
    }

    #[test]
    fn test_monochromatic_graphs() {
        // C(6,6) = 1, C(7,6) = 7, C(8,6) = 28
        assert_eq!(Graph::zeroed(6).clique_count(), 1);
        assert_eq!(Graph::zeroed(7).clique_count(), 7);

        let mut ones = Graph::zeroed(8);
        for a in 0..8 {
            for b in a + 1..8 {
                ones.set_edge(a, b, 1);
            }
        }
        assert_eq!(ones.clique_count(), 28);
    }

    #[test]
    fn test_single_flip_breaks_cliques() {
        let mut graph = Graph::zeroed(7);
        graph.flip(0, 1);
        // Every 6-subset containing both 0 and 1 is broken: C(5,4) = 5 of them.
        assert_eq!(graph.clique_count(), 2);
    }

    #[test]
    fn test_paley_is_counterexample() {
        let graph = paley17();
        assert!(graph.validate().is_ok());
        assert!(graph.is_counterexample());
    }

    #[test]
    fn test_lower_triangle_is_ignored() {
        let mut graph = Graph::zeroed(7);
        // Scribble over the lower triangle and diagonal.
        let n = graph.size();
        for row in 0..n {
            for col in 0..=row {
                graph.edges[row * n + col] = 1;
            }
        }
        assert_eq!(graph.clique_count(), 7);
        assert_eq!(graph.ones(), 0);
        assert_eq!(graph.edge(3, 1), graph.edge(1, 3));
    }

    #[test]
    fn test_new_balanced_is_balanced() {
        for size in [1usize, 2, 7, 8, 32] {
            let graph = Graph::new_balanced(size, &mut rng(size as u64));
            let cells = upper_triangle_cells(size);
            assert_eq!(graph.ones(), cells / 2);
            assert_eq!(graph.parity() as usize, cells % 2);
            assert!(graph.validate().is_ok());
            // Lower triangle untouched.
            for row in 0..size {
                for col in 0..=row {
                    assert_eq!(graph.edges()[row * size + col], 0);
                }
            }
        }
    }

    #[test]
    fn test_grow_stays_balanced_and_keeps_edges() {
        let mut r = rng(11);
        let mut graph = Graph::new_balanced(5, &mut r);
        for _ in 0..20 {
            let before = graph.clone();
            graph.grow(&mut r);
            let old = before.size();
            assert_eq!(graph.size(), old + 1);
            for a in 0..old {
                for b in a + 1..old {
                    assert_eq!(graph.edge(a, b), before.edge(a, b), "size {old} edge ({a}, {b})");
                }
            }
            let cells = upper_triangle_cells(graph.size());
            assert_eq!(graph.ones(), cells / 2, "size {}", graph.size());
            assert_eq!(graph.parity() as usize, cells % 2);
        }
    }

    #[test]
    fn test_validate_rejects_bad_graphs() {
        let err = Graph::from_edges(3, vec![0; 8]).unwrap_err();
        assert_eq!(err, GraphError::ShapeMismatch { size: 3, len: 8 });

        let mut edges = vec![0; 9];
        edges[5] = 2;
        let err = Graph::from_edges(3, edges).unwrap_err();
        assert_eq!(err, GraphError::InvalidValue { index: 5, value: 2 });

        // size^2 overflow must not panic
        let huge = Graph {
            edges: Vec::new(),
            size: usize::MAX,
            parity: 0,
        };
        assert!(huge.validate().is_err());
    }

    #[test]
    fn test_without_vertex() {
        let graph = paley17();
        let smaller = graph.without_vertex(4).unwrap();
        assert_eq!(smaller.size(), 16);
        assert_eq!(smaller.edge(3, 4), graph.edge(3, 5));
        assert_eq!(smaller.edge(0, 15), graph.edge(0, 16));
        assert!(smaller.is_counterexample());

        assert!(graph.without_vertex(17).is_err());
    }

    #[test]
    fn test_read_graph_file_accepts_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("ce17.state");
        let adj = dir.path().join("17_0.adj");
        crate::util::persist::save_state(&state, &paley17()).unwrap();
        text::write_adjacency_file(&adj, &paley17()).unwrap();

        assert_eq!(read_graph_file(&state).unwrap(), paley17());
        assert_eq!(read_graph_file(&adj).unwrap(), paley17());

        let junk = dir.path().join("junk");
        std::fs::write(&junk, "hello").unwrap();
        assert!(read_graph_file(&junk).is_err());
    }

    #[test]
    fn test_relabeled_rejects_bad_order() {
        let graph = Graph::zeroed(4);
        assert!(graph.relabeled(&[0, 1, 2]).is_err());
        assert!(graph.relabeled(&[0, 1, 2, 4]).is_err());
    }

    proptest! {
        #[test]
        fn prop_clique_count_is_label_invariant(
            size in 6usize..12,
            seed in any::<u64>(),
            shuffle_seed in any::<u64>(),
        ) {
            let graph = Graph::new_balanced(size, &mut rng(seed));
            let mut order: Vec<usize> = (0..size).collect();
            order.shuffle(&mut rng(shuffle_seed));
            let relabeled = graph.relabeled(&order).unwrap();
            prop_assert_eq!(graph.clique_count(), relabeled.clique_count());
        }

        #[test]
        fn prop_complement_preserves_count(size in 6usize..11, seed in any::<u64>()) {
            let graph = Graph::new_balanced(size, &mut rng(seed));
            let mut complement = graph.clone();
            for a in 0..size {
                for b in a + 1..size {
                    complement.flip(a, b);
                }
            }
            prop_assert_eq!(graph.clique_count(), complement.clique_count());
        }
    }
}
