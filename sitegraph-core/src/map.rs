//! Directed graph of internal links built from crawled pages.

use crate::depth::UNREACHABLE_DEPTH;
use crate::model::{LinkKind, PageType};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use sitegraph_scanner::Page;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: usize,
    pub url: String,
    /// `None` for targets that were discovered but never crawled.
    pub title: Option<String>,
    pub status: Option<u16>,
    pub crawl_depth: Option<usize>,
    /// Click depth from the root, set by the BFS pass.
    pub depth: Option<usize>,
    pub incoming_links: usize,
    pub outgoing_links: usize,
    pub page_rank: Option<f64>,
    pub is_orphan: bool,
    pub page_type: PageType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub anchor_text: String,
    #[serde(rename = "type")]
    pub kind: LinkKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub total_pages: usize,
    pub total_links: usize,
    pub avg_links_per_page: f64,
    pub max_depth: usize,
}

/// Serializable snapshot handed to reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkGraphResult {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub orphan_pages: Vec<String>,
    pub stats: GraphStats,
}

#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    graph: DiGraph<GraphNode, GraphEdge>,
    index: HashMap<String, NodeIndex>,
    root: Option<String>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every page becomes a node, every internal link an edge. Links to a URL
    /// that redirected during the crawl are pointed at where it redirected to.
    pub fn from_pages(pages: &[Page]) -> Self {
        let mut graph = Self::new();

        let mut aliases: HashMap<&str, &str> = HashMap::new();
        for page in pages {
            if let Some(requested) = &page.requested_url {
                aliases.insert(requested.as_str(), page.url.as_str());
            }
        }

        for page in pages {
            let idx = graph.add_node(&page.url);
            let node = &mut graph.graph[idx];
            node.title = page.title.clone();
            node.status = Some(page.status);
            node.crawl_depth = Some(page.depth);
        }
        if let Some(first) = pages.first() {
            graph.set_root(&first.url);
        }

        for page in pages {
            for link in &page.internal_links {
                let target = aliases
                    .get(link.url.as_str())
                    .copied()
                    .unwrap_or(link.url.as_str());
                graph.add_edge(
                    &page.url,
                    target,
                    &link.anchor_text,
                    LinkKind::from_nofollow(link.nofollow),
                );
            }
        }

        graph
    }

    /// Breadth-first depths are measured from the root.
    pub fn set_root(&mut self, url: &str) {
        self.add_node(url);
        self.root = Some(url.to_string());
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Insert a node for `url` unless one exists.
    pub fn add_node(&mut self, url: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(url) {
            return idx;
        }
        let idx = self.graph.add_node(GraphNode {
            id: self.graph.node_count(),
            url: url.to_string(),
            title: None,
            status: None,
            crawl_depth: None,
            depth: None,
            incoming_links: 0,
            outgoing_links: 0,
            page_rank: None,
            is_orphan: true,
            page_type: PageType::from_url(url),
        });
        self.index.insert(url.to_string(), idx);
        idx
    }

    /// Parallel edges between the same pair are kept.
    pub fn add_edge(&mut self, source: &str, target: &str, anchor_text: &str, kind: LinkKind) {
        let from = self.add_node(source);
        let to = self.add_node(target);
        self.graph.add_edge(
            from,
            to,
            GraphEdge {
                source: source.to_string(),
                target: target.to_string(),
                anchor_text: anchor_text.to_string(),
                kind,
            },
        );
        self.graph[from].outgoing_links += 1;
        let target_node = &mut self.graph[to];
        target_node.incoming_links += 1;
        target_node.is_orphan = false;
    }

    pub fn node(&self, url: &str) -> Option<&GraphNode> {
        self.index.get(url).map(|&idx| &self.graph[idx])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.graph.edge_weights()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&from), Some(&to)) => self.graph.contains_edge(from, to),
            _ => false,
        }
    }

    pub(crate) fn index_of(&self, url: &str) -> Option<NodeIndex> {
        self.index.get(url).copied()
    }

    pub(crate) fn inner(&self) -> &DiGraph<GraphNode, GraphEdge> {
        &self.graph
    }

    pub fn orphan_pages(&self) -> Vec<String> {
        self.nodes()
            .filter(|n| n.incoming_links == 0)
            .map(|n| n.url.clone())
            .collect()
    }

    pub fn apply_page_rank(&mut self, scores: &HashMap<String, f64>) {
        for node in self.graph.node_weights_mut() {
            node.page_rank = scores.get(&node.url).copied();
        }
    }

    pub fn apply_depths(&mut self, depths: &HashMap<String, usize>) {
        for node in self.graph.node_weights_mut() {
            node.depth = depths.get(&node.url).copied();
        }
    }

    pub fn stats(&self) -> GraphStats {
        let total_pages = self.node_count();
        let total_links = self.edge_count();
        GraphStats {
            total_pages,
            total_links,
            avg_links_per_page: if total_pages == 0 {
                0.0
            } else {
                total_links as f64 / total_pages as f64
            },
            max_depth: self
                .nodes()
                .filter_map(|n| n.depth)
                .filter(|&d| d != UNREACHABLE_DEPTH)
                .max()
                .unwrap_or(0),
        }
    }

    pub fn to_result(&self) -> LinkGraphResult {
        LinkGraphResult {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().cloned().collect(),
            orphan_pages: self.orphan_pages(),
            stats: self.stats(),
        }
    }
}
