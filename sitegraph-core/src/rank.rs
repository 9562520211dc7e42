//! Damped, iterative PageRank over the internal link graph.
//!
//! This is deliberately not textbook PageRank: a page with no outgoing links
//! divides its rank by 1 instead of spreading it across every node, so the rank
//! of dangling pages leaks out of the system each iteration. Scores are only
//! meaningful relative to each other, which is why they are rescaled to 0-100.

use crate::map::LinkGraph;
use petgraph::Direction;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageRankParams {
    pub damping: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for PageRankParams {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 20,
            tolerance: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRankScores {
    /// Rescaled to 0-100, keyed by URL.
    pub scores: HashMap<String, f64>,
    pub iterations: usize,
    pub converged: bool,
}

pub fn page_rank(graph: &LinkGraph, params: &PageRankParams) -> PageRankScores {
    let inner = graph.inner();
    let n = inner.node_count();
    if n == 0 {
        return PageRankScores::default();
    }

    let d = params.damping;
    let base = (1.0 - d) / n as f64;
    // Dangling nodes count as having one outgoing link.
    let out_degree: Vec<f64> = inner
        .node_indices()
        .map(|idx| inner[idx].outgoing_links.max(1) as f64)
        .collect();

    let mut ranks = vec![1.0 / n as f64; n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < params.max_iterations {
        iterations += 1;

        let next: Vec<f64> = inner
            .node_indices()
            .map(|idx| {
                let inflow: f64 = inner
                    .edges_directed(idx, Direction::Incoming)
                    .map(|edge| {
                        let src = edge.source().index();
                        ranks[src] / out_degree[src]
                    })
                    .sum();
                base + d * inflow
            })
            .collect();

        let max_change = next
            .iter()
            .zip(&ranks)
            .map(|(new, old)| (new - old).abs())
            .fold(0.0_f64, f64::max);
        ranks = next;

        if max_change < params.tolerance {
            converged = true;
            break;
        }
    }
    debug!(
        "PageRank finished after {} iterations (converged: {})",
        iterations, converged
    );

    let min = ranks.iter().copied().fold(f64::INFINITY, f64::min);
    let max = ranks.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut range = max - min;
    if range == 0.0 {
        range = 1.0;
    }

    let scores = inner
        .node_indices()
        .map(|idx| {
            let scaled = (ranks[idx.index()] - min) / range * 100.0;
            (inner[idx].url.clone(), scaled)
        })
        .collect();

    PageRankScores {
        scores,
        iterations,
        converged,
    }
}
