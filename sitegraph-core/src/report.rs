// Report generation for crawls, audits and link checks

use crate::audit::SiteAudit;
use crate::error::Result;
use serde::Serialize;
use sitegraph_scanner::{CrawlResult, LinkCheckResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";
const THIN_RULE: &str = "────────────────────────────────────────────────────────────────────────────────\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn section(report: &mut String, title: &str) {
    report.push_str(RULE);
    report.push_str(title);
    report.push('\n');
    report.push_str(RULE);
    report.push('\n');
}

fn banner(report: &mut String, title: &str) {
    report.push_str(RULE);
    report.push_str(&format!("{:^80}\n", title));
    report.push_str(RULE);
    report.push('\n');
}

fn push_crawl_summary(report: &mut String, crawl: &CrawlResult) {
    let s = &crawl.summary;
    report.push_str(&format!("Start URL:          {}\n", crawl.start_url));
    report.push_str(&format!("Pages crawled:      {}\n", s.total_pages));
    report.push_str(&format!("Successful:         {}\n", s.successful_pages));
    report.push_str(&format!("Failed:             {}\n", s.failed_pages));
    report.push_str(&format!("Redirected:         {}\n", s.redirected_pages));
    report.push_str(&format!("Internal links:     {}\n", s.total_internal_links));
    report.push_str(&format!("External links:     {}\n", s.total_external_links));
    report.push_str(&format!("Broken links:       {}\n", s.total_broken_links));
    report.push_str(&format!("Avg load time:      {:.0} ms\n", s.avg_load_time));
    report.push('\n');
}

fn push_pages(report: &mut String, crawl: &CrawlResult) {
    section(report, "PAGES");
    for page in &crawl.pages {
        let status = if page.status == 0 {
            "ERR".to_string()
        } else {
            page.status.to_string()
        };
        report.push_str(&format!("[{}] {} (depth {})\n", status, page.url, page.depth));
        if let Some(title) = &page.title {
            report.push_str(&format!("      Title: {}\n", title));
        }
        if let Some(requested) = &page.requested_url {
            report.push_str(&format!("      Redirected from: {}\n", requested));
        }
        if let Some(error) = &page.error {
            report.push_str(&format!("      Error: {}\n", error));
        }
    }
    report.push('\n');
}

fn push_broken_links(report: &mut String, crawl: &CrawlResult) {
    if crawl.summary.total_broken_links == 0 {
        return;
    }
    section(report, "BROKEN LINKS");
    for page in crawl.pages.iter().filter(|p| !p.broken_links.is_empty()) {
        report.push_str(&format!("On {}\n", page.url));
        for link in &page.broken_links {
            let status = if link.status == 0 {
                link.status_text.clone()
            } else {
                format!("{} {}", link.status, link.status_text)
            };
            report.push_str(&format!("  ✗ {} [{}]", link.url, status.trim()));
            if !link.anchor_text.is_empty() {
                report.push_str(&format!(" \"{}\"", link.anchor_text));
            }
            report.push('\n');
        }
        report.push_str(THIN_RULE);
    }
    report.push('\n');
}

pub fn generate_crawl_report(crawl: &CrawlResult) -> String {
    let mut report = String::new();
    banner(&mut report, "SITEGRAPH CRAWL REPORT");
    push_crawl_summary(&mut report, crawl);
    push_pages(&mut report, crawl);
    push_broken_links(&mut report, crawl);
    report.push_str(RULE);
    report
}

fn format_rank(rank: Option<f64>) -> String {
    rank.map(|r| format!("{:.1}", r))
        .unwrap_or_else(|| "-".to_string())
}

pub fn generate_audit_report(audit: &SiteAudit) -> String {
    let mut report = String::new();
    let links = &audit.links;
    let stats = &links.graph.stats;

    banner(&mut report, "SITEGRAPH LINK AUDIT");
    report.push_str(&format!("Audit ID:           {}\n", audit.id));
    report.push_str(&format!("Started:            {}\n", audit.started_at.to_rfc3339()));
    report.push_str(&format!("Finished:           {}\n", audit.finished_at.to_rfc3339()));
    report.push('\n');
    push_crawl_summary(&mut report, &audit.crawl);

    section(&mut report, "LINK GRAPH");
    report.push_str(&format!("Nodes:              {}\n", stats.total_pages));
    report.push_str(&format!("Edges:              {}\n", stats.total_links));
    report.push_str(&format!("Avg links per page: {:.2}\n", stats.avg_links_per_page));
    report.push_str(&format!("Max depth:          {}\n", stats.max_depth));
    report.push_str(&format!(
        "PageRank:           {} iterations ({})\n",
        links.page_rank.iterations,
        if links.page_rank.converged {
            "converged"
        } else {
            "not converged"
        }
    ));
    report.push('\n');

    let mut ranked: Vec<_> = links.graph.nodes.iter().collect();
    ranked.sort_by(|a, b| {
        b.page_rank
            .unwrap_or(0.0)
            .total_cmp(&a.page_rank.unwrap_or(0.0))
    });
    report.push_str("Top pages by PageRank:\n");
    for node in ranked.iter().take(10) {
        report.push_str(&format!(
            "  {:>5}  {} (in {}, out {}, depth {})\n",
            format_rank(node.page_rank),
            node.url,
            node.incoming_links,
            node.outgoing_links,
            node.depth
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string())
        ));
    }
    report.push('\n');

    section(&mut report, "LINK DISTRIBUTION");
    let d = &links.distribution;
    report.push_str(&format!("Avg incoming:       {:.2}\n", d.avg_incoming));
    report.push_str(&format!("Avg outgoing:       {:.2}\n", d.avg_outgoing));
    for (label, urls) in [
        ("Orphans", &d.orphans),
        ("Hubs", &d.hubs),
        ("Authorities", &d.authorities),
        ("Under-linked", &d.under_linked),
        ("Over-linked", &d.over_linked),
        ("Well-linked", &d.well_linked),
    ] {
        report.push_str(&format!("{} ({}):\n", label, urls.len()));
        for url in urls {
            report.push_str(&format!("  - {}\n", url));
        }
    }
    report.push('\n');

    if !links.suggestions.is_empty() {
        section(&mut report, "SUGGESTIONS");
        for (idx, s) in links.suggestions.iter().enumerate() {
            report.push_str(&format!(
                "[{}] [{}] {} -> {}\n",
                idx + 1,
                s.priority.as_str().to_uppercase(),
                s.source,
                s.target
            ));
            report.push_str(&format!("    {}\n", s.reason));
        }
        report.push('\n');
    }

    push_broken_links(&mut report, &audit.crawl);
    report.push_str(RULE);
    report
}

pub fn generate_check_report(results: &[LinkCheckResult]) -> String {
    let mut report = String::new();
    let broken = results.iter().filter(|r| r.broken).count();

    banner(&mut report, "SITEGRAPH LINK CHECK");
    report.push_str(&format!("Links checked:      {}\n", results.len()));
    report.push_str(&format!("Broken:             {}\n", broken));
    report.push('\n');

    for r in results {
        let marker = if r.broken { "✗" } else { "✓" };
        let status = if r.status == 0 {
            r.status_text.clone()
        } else {
            r.status.to_string()
        };
        report.push_str(&format!(
            "{} [{}] {} ({} ms)\n",
            marker, status, r.url, r.response_time_ms
        ));
        if r.redirect_count > 0 {
            report.push_str(&format!(
                "    {} redirect(s): {}\n",
                r.redirect_count,
                r.redirect_chain.join(" -> ")
            ));
        }
    }
    report.push('\n');
    report.push_str(RULE);
    report
}

pub fn save_report(content: &str, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
