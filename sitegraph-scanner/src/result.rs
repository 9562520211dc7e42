use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a fetch or probe did not produce a usable response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Network,
    InvalidUrl,
    InvalidRedirect,
    TooManyRedirects,
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout() -> Self {
        Self::new(FailureKind::Timeout, "Timeout")
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout()
        } else {
            Self::new(FailureKind::Network, err.to_string())
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == FailureKind::Timeout
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A status counts as broken when nothing answered (0) or the server reported an error.
pub fn is_broken_status(status: u16) -> bool {
    status == 0 || status >= 400
}

/// A normalized link found on a crawled page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLink {
    pub url: String,
    pub anchor_text: String,
    pub nofollow: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedirectHop {
    pub from: String,
    pub to: String,
    pub status: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenLink {
    pub url: String,
    pub anchor_text: String,
    pub status: u16,
    pub status_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
}

/// One dequeued URL, fetched or failed. A failed fetch keeps status 0 and an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_url: Option<String>,
    pub title: Option<String>,
    pub depth: usize,
    pub status: u16,
    pub status_text: String,
    #[serde(rename = "loadTime")]
    pub load_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
    pub internal_links: Vec<PageLink>,
    pub external_links: Vec<PageLink>,
    pub broken_links: Vec<BrokenLink>,
    pub redirects: Vec<RedirectHop>,
}

impl Page {
    pub fn new(url: String, depth: usize) -> Self {
        Self {
            url,
            requested_url: None,
            title: None,
            depth,
            status: 0,
            status_text: String::new(),
            load_time_ms: 0,
            content_type: None,
            error: None,
            internal_links: Vec::new(),
            external_links: Vec::new(),
            broken_links: Vec::new(),
            redirects: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_failed(&self) -> bool {
        is_broken_status(self.status)
    }

    pub fn is_redirected(&self) -> bool {
        !self.redirects.is_empty()
    }
}

/// Outcome of probing a single URL for brokenness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCheckResult {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub status_text: String,
    pub redirect_count: usize,
    /// Every URL visited, starting with `url` itself.
    pub redirect_chain: Vec<String>,
    pub broken: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
    pub response_time_ms: u64,
}

impl LinkCheckResult {
    pub fn failed(url: &str, chain: Vec<String>, error: Failure, response_time_ms: u64) -> Self {
        let chain = if chain.is_empty() {
            vec![url.to_string()]
        } else {
            chain
        };
        Self {
            url: url.to_string(),
            final_url: chain.last().cloned().unwrap_or_else(|| url.to_string()),
            status: 0,
            status_text: error.message.clone(),
            redirect_count: chain.len() - 1,
            redirect_chain: chain,
            broken: true,
            error: Some(error),
            response_time_ms,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.error.as_ref().is_some_and(Failure::is_timeout)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlSummary {
    pub total_pages: usize,
    pub successful_pages: usize,
    pub failed_pages: usize,
    pub redirected_pages: usize,
    pub total_broken_links: usize,
    /// Milliseconds.
    pub avg_load_time: f64,
    pub total_internal_links: usize,
    pub total_external_links: usize,
}

impl CrawlSummary {
    pub fn from_pages(pages: &[Page]) -> Self {
        let total_pages = pages.len();
        let total_load: u64 = pages.iter().map(|p| p.load_time_ms).sum();

        Self {
            total_pages,
            successful_pages: pages.iter().filter(|p| p.is_success()).count(),
            failed_pages: pages.iter().filter(|p| p.is_failed()).count(),
            redirected_pages: pages.iter().filter(|p| p.is_redirected()).count(),
            total_broken_links: pages.iter().map(|p| p.broken_links.len()).sum(),
            avg_load_time: if total_pages == 0 {
                0.0
            } else {
                total_load as f64 / total_pages as f64
            },
            total_internal_links: pages.iter().map(|p| p.internal_links.len()).sum(),
            total_external_links: pages.iter().map(|p| p.external_links.len()).sum(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    pub start_url: String,
    pub pages: Vec<Page>,
    pub summary: CrawlSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(status: u16, redirects: usize, load: u64) -> Page {
        let mut page = Page::new(format!("http://example.com/{}", status), 0);
        page.status = status;
        page.load_time_ms = load;
        for i in 0..redirects {
            page.redirects.push(RedirectHop {
                from: format!("http://example.com/r{}", i),
                to: page.url.clone(),
                status: 301,
            });
        }
        page
    }

    #[test]
    fn test_summary_counts() {
        let mut ok = page(200, 1, 100);
        ok.internal_links.push(PageLink {
            url: "http://example.com/a".to_string(),
            anchor_text: "A".to_string(),
            nofollow: false,
        });
        ok.broken_links.push(BrokenLink {
            url: "http://example.com/gone".to_string(),
            anchor_text: "gone".to_string(),
            status: 404,
            status_text: "Not Found".to_string(),
            error: None,
        });
        let pages = vec![ok, page(404, 0, 50), page(0, 0, 0)];

        let summary = CrawlSummary::from_pages(&pages);

        assert_eq!(summary.total_pages, 3);
        assert_eq!(summary.successful_pages, 1);
        assert_eq!(summary.failed_pages, 2);
        assert_eq!(summary.redirected_pages, 1);
        assert_eq!(summary.total_broken_links, 1);
        assert_eq!(summary.total_internal_links, 1);
        assert!((summary.avg_load_time - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_of_nothing() {
        let summary = CrawlSummary::from_pages(&[]);
        assert_eq!(summary, CrawlSummary::default());
    }

    #[test]
    fn test_failed_check_result_keeps_url_in_chain() {
        let result = LinkCheckResult::failed("http://example.com/x", vec![], Failure::timeout(), 10);
        assert!(result.broken);
        assert!(result.is_timeout());
        assert_eq!(result.status, 0);
        assert_eq!(result.redirect_chain, vec!["http://example.com/x".to_string()]);
        assert_eq!(result.redirect_count, 0);
    }

    #[test]
    fn test_page_serializes_camel_case() {
        let json = serde_json::to_value(page(200, 0, 12)).unwrap();
        assert_eq!(json["loadTime"], 12);
        assert_eq!(json["statusText"], "");
        assert!(json.get("internalLinks").is_some());
        assert!(json.get("requestedUrl").is_none());
    }
}
