//! ramsey-miner - distributed search for Ramsey R(6,6) counterexamples
//!
//! A counterexample is a 2-coloring of the edges of the complete graph on N
//! vertices with no monochromatic 6-clique. Workers grow such colorings
//! one odd prime at a time and repair them with a parallel taboo search;
//! a coordinator keeps every worker on the largest one found so far.
//!
//! # Architecture
//!
//! - **Graph model**: flat adjacency matrix, clique counting, text format
//! - **Taboo search**: parallel best-move rounds driven by a [`search::SearchDriver`]
//! - **Distributed mode**: coordinator with worker registry and preemption pushes
//! - **Solution bank**: one stored representative per isomorphism class

pub mod bank;
pub mod config;
pub mod distributed;
pub mod graph;
pub mod output;
pub mod search;
pub mod util;

// Re-export commonly used types
pub use config::Config;
pub use graph::Graph;

/// Result type used throughout ramsey-miner
pub type Result<T> = anyhow::Result<T>;
