use crate::map::LinkGraph;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkRole {
    WellLinked,
    UnderLinked,
    OverLinked,
    Hub,
    Authority,
}

/// Roles of one node relative to the population means. A node can hold several
/// roles at once, or none.
pub fn link_roles(incoming: usize, outgoing: usize, avg_in: f64, avg_out: f64) -> Vec<LinkRole> {
    let incoming = incoming as f64;
    let outgoing = outgoing as f64;
    let mut roles = Vec::new();

    if incoming >= 0.5 * avg_in && outgoing >= 0.5 * avg_out && outgoing <= 2.0 * avg_out {
        roles.push(LinkRole::WellLinked);
    }
    if incoming < 0.3 * avg_in {
        roles.push(LinkRole::UnderLinked);
    }
    if outgoing > 3.0 * avg_out {
        roles.push(LinkRole::OverLinked);
    }
    if outgoing > 2.0 * avg_out {
        roles.push(LinkRole::Hub);
    }
    if incoming > 2.0 * avg_in {
        roles.push(LinkRole::Authority);
    }

    roles
}

/// Node URLs grouped by role, in graph insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDistribution {
    pub avg_incoming: f64,
    pub avg_outgoing: f64,
    pub well_linked: Vec<String>,
    pub under_linked: Vec<String>,
    pub over_linked: Vec<String>,
    pub hubs: Vec<String>,
    pub authorities: Vec<String>,
    /// Zero incoming internal links; independent of the mean-relative roles.
    pub orphans: Vec<String>,
}

pub fn analyze_distribution(graph: &LinkGraph) -> LinkDistribution {
    let count = graph.node_count();
    if count == 0 {
        return LinkDistribution::default();
    }

    let (total_in, total_out) = graph.nodes().fold((0, 0), |(i, o), node| {
        (i + node.incoming_links, o + node.outgoing_links)
    });
    let avg_incoming = total_in as f64 / count as f64;
    let avg_outgoing = total_out as f64 / count as f64;

    let mut distribution = LinkDistribution {
        avg_incoming,
        avg_outgoing,
        orphans: graph.orphan_pages(),
        ..Default::default()
    };

    for node in graph.nodes() {
        for role in link_roles(node.incoming_links, node.outgoing_links, avg_incoming, avg_outgoing) {
            let bucket = match role {
                LinkRole::WellLinked => &mut distribution.well_linked,
                LinkRole::UnderLinked => &mut distribution.under_linked,
                LinkRole::OverLinked => &mut distribution.over_linked,
                LinkRole::Hub => &mut distribution.hubs,
                LinkRole::Authority => &mut distribution.authorities,
            };
            bucket.push(node.url.clone());
        }
    }

    distribution
}
