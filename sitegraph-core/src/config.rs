use crate::error::{CoreError, Result};
use crate::rank::PageRankParams;
use serde::{Deserialize, Serialize};
use sitegraph_scanner::checker::{DEFAULT_CONCURRENCY, PROBE_TIMEOUT};
use sitegraph_scanner::crawler::{DEFAULT_DELAY, DEFAULT_MAX_DEPTH};
use sitegraph_scanner::fetch::{DEFAULT_USER_AGENT, PAGE_TIMEOUT};
use std::fs;
use std::path::Path;

/// Page budget for a plain crawl.
pub const CRAWL_MAX_PAGES: usize = 50;
/// Page budget for a link-graph audit.
pub const MAP_MAX_PAGES: usize = 20;

/// Audit settings, loadable from JSON. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditConfig {
    pub max_depth: usize,
    /// Left unset, each command picks its own budget.
    pub max_pages: Option<usize>,
    pub check_external: bool,
    pub delay_ms: u64,
    pub link_check_concurrency: usize,
    pub page_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub user_agent: String,
    pub page_rank: PageRankParams,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_pages: None,
            check_external: false,
            delay_ms: DEFAULT_DELAY.as_millis() as u64,
            link_check_concurrency: DEFAULT_CONCURRENCY,
            page_timeout_secs: PAGE_TIMEOUT.as_secs(),
            probe_timeout_secs: PROBE_TIMEOUT.as_secs(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            page_rank: PageRankParams::default(),
        }
    }
}

impl AuditConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| CoreError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn max_pages_or(&self, default: usize) -> usize {
        self.max_pages.unwrap_or(default)
    }
}
