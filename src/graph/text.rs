//! Plain-text adjacency format
//!
//! This is the format handed to the external isomorphism checker and used
//! for seed graphs:
//!
//! ```text
//! 4 0
//! 0 1 0 1
//! 1 0 0 1
//! 0 0 0 1
//! 1 1 1 0
//! ```
//!
//! The header holds the vertex count followed by a literal `0`. Each of the
//! next `size` lines holds `size` whitespace-separated 0/1 values. Writers
//! emit the symmetric matrix; readers take the upper triangle.

use super::{Graph, GraphError};
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Render a graph as adjacency text.
pub fn to_adjacency_text(graph: &Graph) -> String {
    let size = graph.size();
    let mut out = String::with_capacity(16 + size * size * 2);
    let _ = writeln!(out, "{size} 0");
    for row in 0..size {
        for col in 0..size {
            if col > 0 {
                out.push(' ');
            }
            let color = if row == col { 0 } else { graph.edge(row, col) };
            out.push(if color == 1 { '1' } else { '0' });
        }
        out.push('\n');
    }
    out
}

/// Parse adjacency text into a graph.
pub fn parse_adjacency_text(text: &str) -> Result<Graph, GraphError> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let header = lines
        .next()
        .ok_or_else(|| GraphError::Parse("empty input".to_string()))?;
    let size: usize = header
        .split_whitespace()
        .next()
        .and_then(|token| token.parse().ok())
        .ok_or_else(|| GraphError::Parse(format!("bad header line {header:?}")))?;

    // Every cell takes at least one byte of input.
    if size.checked_mul(size).map_or(true, |cells| cells > text.len()) {
        return Err(GraphError::Parse(format!(
            "header claims {size} vertices but input has only {} bytes",
            text.len()
        )));
    }

    let mut graph = Graph::zeroed(size);
    for row in 0..size {
        let line = lines
            .next()
            .ok_or_else(|| GraphError::Parse(format!("expected {size} rows, got {row}")))?;
        let mut count = 0;
        for (col, token) in line.split_whitespace().enumerate() {
            let color = match token {
                "0" => 0,
                "1" => 1,
                other => {
                    return Err(GraphError::Parse(format!(
                        "row {row} col {col}: unexpected value {other:?}"
                    )))
                }
            };
            if col < size && col > row {
                graph.set_edge(row, col, color);
            }
            count += 1;
        }
        if count != size {
            return Err(GraphError::Parse(format!(
                "row {row} has {count} values, expected {size}"
            )));
        }
    }
    if lines.next().is_some() {
        return Err(GraphError::Parse(format!("more than {size} rows")));
    }
    Ok(graph)
}

/// Write a graph to `path` in adjacency text form.
pub fn write_adjacency_file(path: &Path, graph: &Graph) -> Result<()> {
    fs::write(path, to_adjacency_text(graph))
        .with_context(|| format!("Failed to write adjacency file: {}", path.display()))
}

/// Read a graph from an adjacency text file.
pub fn read_adjacency_file(path: &Path) -> Result<Graph> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read adjacency file: {}", path.display()))?;
    parse_adjacency_text(&text)
        .with_context(|| format!("Failed to parse adjacency file: {}", path.display()))
}
