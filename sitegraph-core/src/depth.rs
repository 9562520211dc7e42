use crate::map::LinkGraph;
use petgraph::Direction;
use std::collections::{HashMap, VecDeque};

/// Depth reported for nodes the root cannot reach.
pub const UNREACHABLE_DEPTH: usize = 999;

/// Minimum hop count from `root` to every node along outgoing links.
/// Every node gets an entry; unreachable ones (or all, if `root` is unknown)
/// get [`UNREACHABLE_DEPTH`].
pub fn bfs_depths(graph: &LinkGraph, root: &str) -> HashMap<String, usize> {
    let inner = graph.inner();
    let mut depths: Vec<Option<usize>> = vec![None; inner.node_count()];

    if let Some(start) = graph.index_of(root) {
        let mut frontier = VecDeque::new();
        depths[start.index()] = Some(0);
        frontier.push_back((start, 0));

        while let Some((current, depth)) = frontier.pop_front() {
            for neighbor in inner.neighbors_directed(current, Direction::Outgoing) {
                if depths[neighbor.index()].is_none() {
                    depths[neighbor.index()] = Some(depth + 1);
                    frontier.push_back((neighbor, depth + 1));
                }
            }
        }
    }

    inner
        .node_indices()
        .map(|idx| {
            let depth = depths[idx.index()].unwrap_or(UNREACHABLE_DEPTH);
            (inner[idx].url.clone(), depth)
        })
        .collect()
}
