use crate::depth::UNREACHABLE_DEPTH;
use crate::distribution::LinkDistribution;
use crate::map::LinkGraph;
use crate::model::{PageType, Priority};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const MAX_SUGGESTIONS: usize = 10;
/// Pages deeper than this many clicks from the root get a low-priority suggestion.
pub const DEEP_PAGE_DEPTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSuggestion {
    pub source: String,
    pub target: String,
    pub reason: String,
    pub priority: Priority,
}

struct Suggestions<'a> {
    graph: &'a LinkGraph,
    items: Vec<LinkSuggestion>,
    pairs: HashSet<(String, String)>,
}

impl<'a> Suggestions<'a> {
    /// Existing links, self links and repeats are never suggested.
    fn allowed(&self, source: &str, target: &str) -> bool {
        source != target
            && !self.graph.has_edge(source, target)
            && !self.pairs.contains(&(source.to_string(), target.to_string()))
    }

    fn push(&mut self, source: &str, target: &str, reason: String, priority: Priority) {
        self.pairs.insert((source.to_string(), target.to_string()));
        self.items.push(LinkSuggestion {
            source: source.to_string(),
            target: target.to_string(),
            reason,
            priority,
        });
    }
}

/// Deterministic, single pass per rule over the annotated graph:
/// orphans get a link from a same-type page (high), weakly linked pages get a
/// link from a hub (medium), and deep pages get a link from the root (low).
pub fn suggest_links(graph: &LinkGraph, distribution: &LinkDistribution) -> Vec<LinkSuggestion> {
    let mut out = Suggestions {
        graph,
        items: Vec::new(),
        pairs: HashSet::new(),
    };

    for orphan_url in &distribution.orphans {
        let Some(orphan) = graph.node(orphan_url) else {
            continue;
        };
        let donor = graph.nodes().find(|n| {
            n.page_type == orphan.page_type && !n.is_orphan && out.allowed(&n.url, orphan_url)
        });
        if let Some(donor) = donor {
            out.push(
                &donor.url,
                orphan_url,
                format!(
                    "Orphan {} page has no incoming internal links; link it from a related {} page",
                    orphan.page_type, donor.page_type
                ),
                Priority::High,
            );
        }
    }

    for node in graph.nodes() {
        if node.is_orphan || node.page_type == PageType::Homepage || node.incoming_links >= 2 {
            continue;
        }
        if let Some(hub) = distribution.hubs.iter().find(|hub| out.allowed(hub, &node.url)) {
            out.push(
                hub,
                &node.url,
                format!(
                    "Only {} incoming internal link{}; add one from a hub page",
                    node.incoming_links,
                    if node.incoming_links == 1 { "" } else { "s" }
                ),
                Priority::Medium,
            );
        }
    }

    if let Some(root) = graph.root() {
        for node in graph.nodes() {
            let Some(depth) = node.depth else {
                continue;
            };
            if depth > DEEP_PAGE_DEPTH && depth != UNREACHABLE_DEPTH && out.allowed(root, &node.url) {
                out.push(
                    root,
                    &node.url,
                    format!("Page is {} clicks from the homepage; link it closer to the root", depth),
                    Priority::Low,
                );
            }
        }
    }

    let mut items = out.items;
    items.sort_by_key(|s| s.priority);
    items.truncate(MAX_SUGGESTIONS);
    items
}
