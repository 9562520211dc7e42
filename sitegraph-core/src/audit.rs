use crate::crawl::{CrawlOptions, CrawlProgressCallback, execute_crawl};
use crate::depth::bfs_depths;
use crate::distribution::{LinkDistribution, analyze_distribution};
use crate::error::Result;
use crate::map::{LinkGraph, LinkGraphResult};
use crate::rank::{PageRankParams, page_rank};
use crate::suggest::{LinkSuggestion, suggest_links};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitegraph_scanner::CrawlResult;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRankRun {
    pub iterations: usize,
    pub converged: bool,
}

/// Annotated link graph plus everything derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkAnalysis {
    pub graph: LinkGraphResult,
    pub distribution: LinkDistribution,
    pub page_rank: PageRankRun,
    pub suggestions: Vec<LinkSuggestion>,
}

/// Build the graph from a finished crawl, then rank, measure depth from the
/// first crawled page, classify and suggest.
pub fn analyze_links(crawl: &CrawlResult, params: &PageRankParams) -> LinkAnalysis {
    let mut graph = LinkGraph::from_pages(&crawl.pages);

    let ranks = page_rank(&graph, params);
    graph.apply_page_rank(&ranks.scores);

    if let Some(root) = graph.root().map(str::to_string) {
        let depths = bfs_depths(&graph, &root);
        graph.apply_depths(&depths);
    }

    let distribution = analyze_distribution(&graph);
    let suggestions = suggest_links(&graph, &distribution);

    info!(
        "Link graph: {} nodes, {} edges, {} orphans, {} suggestions",
        graph.node_count(),
        graph.edge_count(),
        distribution.orphans.len(),
        suggestions.len()
    );

    LinkAnalysis {
        graph: graph.to_result(),
        distribution,
        page_rank: PageRankRun {
            iterations: ranks.iterations,
            converged: ranks.converged,
        },
        suggestions,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteAudit {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub crawl: CrawlResult,
    #[serde(flatten)]
    pub links: LinkAnalysis,
}

/// Crawl with `options` and analyze the resulting link graph.
pub async fn run_audit(
    options: CrawlOptions,
    params: &PageRankParams,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<SiteAudit> {
    let started_at = Utc::now();
    let crawl = execute_crawl(options, progress_callback).await?;
    let links = analyze_links(&crawl, params);

    Ok(SiteAudit {
        id: Uuid::new_v4().to_string(),
        started_at,
        finished_at: Utc::now(),
        crawl,
        links,
    })
}
