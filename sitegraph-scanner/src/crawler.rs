use crate::checker::LinkChecker;
use crate::error::Result;
use crate::extract::{DocumentExtractor, HtmlExtractor};
use crate::fetch::{FetchedPage, PageFetcher};
use crate::normalize::{LinkScope, SiteOrigin, normalize_link, parse_seed};
use crate::result::{BrokenLink, CrawlResult, CrawlSummary, Failure, LinkCheckResult, Page, PageLink};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

pub const DEFAULT_MAX_DEPTH: usize = 3;
pub const DEFAULT_MAX_PAGES: usize = 50;
pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);

/// Queue and visitation bookkeeping for one crawl. Owned by a single `crawl` call.
#[derive(Debug, Default)]
pub struct CrawlState {
    queue: VecDeque<(String, usize)>,
    visited: HashSet<String>,
    seen: HashSet<String>,
}

impl CrawlState {
    pub fn new(seed: String) -> Self {
        let mut state = Self::default();
        state.enqueue(seed, 0);
        state
    }

    pub fn next(&mut self) -> Option<(String, usize)> {
        self.queue.pop_front()
    }

    /// Queue `url` unless it was already visited or queued.
    pub fn enqueue(&mut self, url: String, depth: usize) -> bool {
        if self.visited.contains(&url) || !self.seen.insert(url.clone()) {
            return false;
        }
        self.queue.push_back((url, depth));
        true
    }

    /// Returns false when `url` had already been visited.
    pub fn mark_visited(&mut self, url: &str) -> bool {
        self.seen.insert(url.to_string());
        self.visited.insert(url.to_string())
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Status of a link target, either crawled or probed.
#[derive(Debug, Clone)]
struct TargetStatus {
    status: u16,
    status_text: String,
    error: Option<Failure>,
}

impl TargetStatus {
    fn is_broken(&self) -> bool {
        crate::result::is_broken_status(self.status)
    }
}

impl From<&Page> for TargetStatus {
    fn from(page: &Page) -> Self {
        Self {
            status: page.status,
            status_text: page.status_text.clone(),
            error: page.error.clone(),
        }
    }
}

impl From<LinkCheckResult> for TargetStatus {
    fn from(result: LinkCheckResult) -> Self {
        Self {
            status: result.status,
            status_text: result.status_text,
            error: result.error,
        }
    }
}

/// Breadth-first, single-site crawler bounded by depth and page budgets.
pub struct Crawler {
    fetcher: PageFetcher,
    checker: LinkChecker,
    extractor: Arc<dyn DocumentExtractor>,
    max_depth: usize,
    max_pages: usize,
    delay: Duration,
    check_external: bool,
    progress_callback: Option<ProgressCallback>,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl Crawler {
    pub fn new() -> Result<Self> {
        Ok(Self::with_clients(PageFetcher::new()?, LinkChecker::new()?))
    }

    pub fn with_clients(fetcher: PageFetcher, checker: LinkChecker) -> Self {
        Self {
            fetcher,
            checker,
            extractor: Arc::new(HtmlExtractor::new()),
            max_depth: DEFAULT_MAX_DEPTH,
            max_pages: DEFAULT_MAX_PAGES,
            delay: DEFAULT_DELAY,
            check_external: false,
            progress_callback: None,
            cancel_flag: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_pages(mut self, pages: usize) -> Self {
        self.max_pages = pages;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_check_external(mut self, check_external: bool) -> Self {
        self.check_external = check_external;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn DocumentExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    pub async fn crawl(&self, start_url: &str) -> Result<CrawlResult> {
        let seed = parse_seed(start_url)?;
        let mut origin = SiteOrigin::new(&seed)?;
        info!(
            "Starting crawl of {} (max depth {}, max pages {})",
            seed, self.max_depth, self.max_pages
        );

        let mut state = CrawlState::new(seed.to_string());
        let mut pages: Vec<Page> = Vec::new();
        let mut fetched_any = false;

        while pages.len() < self.max_pages {
            if self
                .cancel_flag
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
            {
                warn!("Crawl cancelled after {} pages", pages.len());
                break;
            }

            let Some((url, depth)) = state.next() else {
                break;
            };
            if state.is_visited(&url) || depth > self.max_depth {
                continue;
            }
            state.mark_visited(&url);

            if fetched_any && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            fetched_any = true;

            if let Some(ref callback) = self.progress_callback {
                callback(pages.len(), url.clone());
            }

            let fetched = self.fetcher.fetch(&url).await;

            if fetched.final_url != url && !state.mark_visited(&fetched.final_url) {
                debug!("{} redirected to already visited {}", url, fetched.final_url);
                continue;
            }

            // A seed that redirects off its origin (http -> https, apex -> www)
            // moves the crawl to where the site actually lives.
            if pages.is_empty()
                && !origin.is_internal(&fetched.final_url)
                && let Ok(final_url) = Url::parse(&fetched.final_url)
                && let Ok(moved) = SiteOrigin::new(&final_url)
            {
                info!("Seed redirected, crawling origin {} instead of {}", moved.as_str(), origin.as_str());
                origin = moved;
            }

            // Past the seed, a redirect off the site leaves the link to the broken-link pass.
            if !origin.is_internal(&fetched.final_url) {
                debug!("{} redirected off the site to {}", url, fetched.final_url);
                continue;
            }

            let page = self.build_page(fetched, depth, &origin);
            match &page.error {
                Some(error) => warn!("Fetch of {} failed: {}", page.url, error),
                None => debug!(
                    "[{}] {} (depth {}, {} internal links)",
                    page.status,
                    page.url,
                    depth,
                    page.internal_links.len()
                ),
            }

            if depth < self.max_depth {
                for link in &page.internal_links {
                    state.enqueue(link.url.clone(), depth + 1);
                }
            }

            pages.push(page);
        }

        info!(
            "Crawl complete. Recorded {} pages, {} still queued",
            pages.len(),
            state.pending()
        );

        self.attach_broken_links(&mut pages).await;

        let summary = CrawlSummary::from_pages(&pages);
        Ok(CrawlResult {
            start_url: seed.to_string(),
            pages,
            summary,
        })
    }

    fn build_page(&self, fetched: FetchedPage, depth: usize, origin: &SiteOrigin) -> Page {
        let mut page = Page::new(fetched.final_url.clone(), depth);
        if fetched.requested_url != fetched.final_url {
            page.requested_url = Some(fetched.requested_url.clone());
        }
        page.status = fetched.status;
        page.status_text = fetched.status_text.clone();
        page.load_time_ms = fetched.load_time.as_millis() as u64;
        page.content_type = fetched.content_type.clone();
        page.error = fetched.error.clone();
        page.redirects = fetched.redirects.clone();

        if !fetched.is_success() || !fetched.is_html() || !origin.is_internal(&page.url) {
            return page;
        }
        let Ok(base) = Url::parse(&page.url) else {
            return page;
        };

        let document = self.extractor.extract_page(&fetched.body);
        page.title = document.title;

        for raw in document.links {
            let nofollow = raw.is_nofollow();
            let Some(target) = normalize_link(&raw.href, &base) else {
                continue;
            };
            let link = PageLink {
                url: target.to_string(),
                anchor_text: raw.text,
                nofollow,
            };
            match origin.classify(&link.url) {
                LinkScope::Internal => page.internal_links.push(link),
                LinkScope::External => page.external_links.push(link),
            }
        }

        page
    }

    /// Resolve every linked target to a status, probing only those the crawl
    /// did not fetch itself, then list the broken ones on each linking page.
    async fn attach_broken_links(&self, pages: &mut [Page]) {
        let mut known: HashMap<String, TargetStatus> = HashMap::new();
        for page in pages.iter() {
            known.insert(page.url.clone(), TargetStatus::from(page));
            if let Some(requested) = &page.requested_url {
                known
                    .entry(requested.clone())
                    .or_insert_with(|| TargetStatus::from(page));
            }
        }

        let mut to_probe = Vec::new();
        let mut queued = HashSet::new();
        for page in pages.iter() {
            for link in self.checked_links(page) {
                if !known.contains_key(&link.url) && queued.insert(link.url.clone()) {
                    to_probe.push(link.url.clone());
                }
            }
        }

        if !to_probe.is_empty() {
            for result in self.checker.check_all(&to_probe).await {
                known.insert(result.url.clone(), TargetStatus::from(result));
            }
        }

        for page in pages.iter_mut() {
            let mut reported = HashSet::new();
            let mut broken = Vec::new();
            for link in self.checked_links(page) {
                if let Some(status) = known.get(&link.url)
                    && status.is_broken()
                    && reported.insert(link.url.clone())
                {
                    broken.push(BrokenLink {
                        url: link.url.clone(),
                        anchor_text: link.anchor_text.clone(),
                        status: status.status,
                        status_text: status.status_text.clone(),
                        error: status.error.clone(),
                    });
                }
            }
            page.broken_links = broken;
        }
    }

    fn checked_links<'a>(&self, page: &'a Page) -> impl Iterator<Item = &'a PageLink> + 'a {
        let external: &'a [PageLink] = if self.check_external {
            &page.external_links
        } else {
            &[]
        };
        page.internal_links.iter().chain(external.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::PROBE_TIMEOUT;
    use crate::fetch::DEFAULT_USER_AGENT;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn test_crawler() -> Crawler {
        let fetcher = PageFetcher::with_settings(DEFAULT_USER_AGENT, Duration::from_secs(5)).unwrap();
        let checker = LinkChecker::with_settings(DEFAULT_USER_AGENT, PROBE_TIMEOUT).unwrap();
        Crawler::with_clients(fetcher, checker).with_delay(Duration::ZERO)
    }

    async fn mount_html(server: &MockServer, route: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
            .mount(server)
            .await;
    }

    fn links_page(title: &str, hrefs: &[&str]) -> String {
        let anchors: String = hrefs
            .iter()
            .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
            .collect();
        format!("<html><head><title>{}</title></head><body>{}</body></html>", title, anchors)
    }

    /// A -> B, C; B -> D; C -> D, plus a chain D -> E -> F to exercise depth limits.
    async fn diamond_site() -> MockServer {
        let server = MockServer::start().await;
        mount_html(&server, "/", links_page("A", &["/b", "/c", "https://external.example/"])).await;
        mount_html(&server, "/b", links_page("B", &["/d"])).await;
        mount_html(&server, "/c", links_page("C", &["/d", "/"])).await;
        mount_html(&server, "/d", links_page("D", &["/e"])).await;
        mount_html(&server, "/e", links_page("E", &["/f"])).await;
        mount_html(&server, "/f", links_page("F", &[])).await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_breadth_first_discovery() {
        let server = diamond_site().await;

        let result = test_crawler()
            .with_max_depth(2)
            .crawl(&server.uri())
            .await
            .unwrap();

        let urls: Vec<String> = result.pages.iter().map(|p| p.url.clone()).collect();
        let uri = server.uri();
        assert_eq!(
            urls,
            vec![
                format!("{}/", uri),
                format!("{}/b", uri),
                format!("{}/c", uri),
                format!("{}/d", uri),
            ]
        );
        assert_eq!(result.pages[0].depth, 0);
        assert_eq!(result.pages[1].depth, 1);
        assert_eq!(result.pages[3].depth, 2);
        assert_eq!(result.pages[0].title.as_deref(), Some("A"));
        assert_eq!(result.pages[0].external_links.len(), 1);
        assert_eq!(result.summary.total_pages, 4);
        assert_eq!(result.summary.successful_pages, 4);
    }

    #[tokio::test]
    async fn test_visitation_uniqueness_and_budgets() {
        let server = diamond_site().await;

        for (max_depth, max_pages) in [(0, 10), (1, 10), (3, 3), (5, 50)] {
            let result = test_crawler()
                .with_max_depth(max_depth)
                .with_max_pages(max_pages)
                .crawl(&server.uri())
                .await
                .unwrap();

            let unique: HashSet<_> = result.pages.iter().map(|p| &p.url).collect();
            assert_eq!(unique.len(), result.pages.len());
            assert!(result.pages.len() <= max_pages);
            assert!(result.pages.iter().all(|p| p.depth <= max_depth));
        }
    }

    #[tokio::test]
    async fn test_single_page_budget() {
        let server = diamond_site().await;

        let result = test_crawler()
            .with_max_pages(1)
            .crawl(&server.uri())
            .await
            .unwrap();

        assert_eq!(result.pages.len(), 1);
        assert_eq!(result.pages[0].internal_links.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_pages_are_recorded_not_fatal() {
        let server = MockServer::start().await;
        mount_html(&server, "/", links_page("Home", &["/missing", "/ok"])).await;
        mount_html(&server, "/ok", links_page("Ok", &[])).await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = test_crawler().crawl(&server.uri()).await.unwrap();

        assert_eq!(result.pages.len(), 3);
        let missing = result
            .pages
            .iter()
            .find(|p| p.url.ends_with("/missing"))
            .unwrap();
        assert_eq!(missing.status, 404);
        assert!(missing.is_failed());

        // The homepage links to a crawled 404, which is reported without a probe.
        let home = &result.pages[0];
        assert_eq!(home.broken_links.len(), 1);
        assert_eq!(home.broken_links[0].status, 404);
        assert_eq!(result.summary.failed_pages, 1);
        assert_eq!(result.summary.total_broken_links, 1);
    }

    #[tokio::test]
    async fn test_uncrawled_targets_are_probed() {
        let server = MockServer::start().await;
        mount_html(&server, "/", links_page("Home", &["/gone", "/fine"])).await;
        Mock::given(method("HEAD"))
            .and(path("/fine"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let result = test_crawler()
            .with_max_pages(1)
            .crawl(&server.uri())
            .await
            .unwrap();

        let broken = &result.pages[0].broken_links;
        assert_eq!(broken.len(), 1);
        assert!(broken[0].url.ends_with("/gone"));
        assert_eq!(broken[0].status, 404);
        assert_eq!(broken[0].anchor_text, "/gone");
    }

    #[tokio::test]
    async fn test_redirected_page_records_final_url() {
        let server = MockServer::start().await;
        mount_html(&server, "/", links_page("Home", &["/old", "/new"])).await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
            .mount(&server)
            .await;
        mount_html(&server, "/new", links_page("New", &[])).await;

        let result = test_crawler().crawl(&server.uri()).await.unwrap();

        let urls: Vec<_> = result.pages.iter().map(|p| p.url.clone()).collect();
        assert_eq!(urls.len(), 2, "{:?}", urls);
        let new_page = &result.pages[1];
        assert!(new_page.url.ends_with("/new"));
        assert_eq!(new_page.redirects.len(), 1);
        assert!(new_page.requested_url.as_deref().is_some_and(|u| u.ends_with("/old")));
        assert_eq!(result.summary.redirected_pages, 1);
    }

    #[tokio::test]
    async fn test_redirect_off_the_site_is_not_a_page() {
        let server = MockServer::start().await;
        let elsewhere = MockServer::start().await;
        mount_html(&server, "/", links_page("Home", &["/go", "/stay"])).await;
        mount_html(&server, "/stay", links_page("Stay", &[])).await;
        Mock::given(path("/go"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{}/landing", elsewhere.uri()).as_str()),
            )
            .mount(&server)
            .await;
        mount_html(&elsewhere, "/landing", links_page("Landing", &["/deeper"])).await;
        Mock::given(method("HEAD"))
            .and(path("/landing"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&elsewhere)
            .await;

        let result = test_crawler()
            .with_max_pages(2)
            .crawl(&server.uri())
            .await
            .unwrap();

        let origin = SiteOrigin::new(&Url::parse(&server.uri()).unwrap()).unwrap();
        let urls: Vec<_> = result.pages.iter().map(|p| p.url.clone()).collect();
        assert_eq!(
            urls,
            vec![format!("{}/", server.uri()), format!("{}/stay", server.uri())]
        );
        for page in &result.pages {
            assert!(origin.is_internal(&page.url));
            assert!(page.internal_links.iter().all(|l| origin.is_internal(&l.url)));
        }
        assert!(result.pages[0].broken_links.is_empty());
    }

    #[tokio::test]
    async fn test_progress_and_cancellation() {
        let server = diamond_site().await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let cancel = Arc::new(AtomicBool::new(false));

        let seen_clone = seen.clone();
        let cancel_clone = cancel.clone();
        let crawler = test_crawler()
            .with_progress_callback(Arc::new(move |done, url| {
                seen_clone.lock().unwrap().push(url);
                if done == 1 {
                    cancel_clone.store(true, Ordering::Relaxed);
                }
            }))
            .with_cancel_flag(cancel);

        let result = crawler.crawl(&server.uri()).await.unwrap();

        assert_eq!(result.pages.len(), 2);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_seed_is_rejected() {
        let err = test_crawler().crawl("definitely not a url").await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_seed_still_produces_page() {
        let result = test_crawler().crawl("http://127.0.0.1:9/").await.unwrap();

        assert_eq!(result.pages.len(), 1);
        assert_eq!(result.pages[0].status, 0);
        assert!(result.pages[0].error.is_some());
        assert_eq!(result.summary.failed_pages, 1);
    }

    #[test]
    fn test_crawl_state_never_requeues() {
        let mut state = CrawlState::new("http://a/".to_string());
        assert!(!state.enqueue("http://a/".to_string(), 1));
        assert!(state.enqueue("http://a/b".to_string(), 1));
        assert!(!state.enqueue("http://a/b".to_string(), 2));

        let (url, depth) = state.next().unwrap();
        assert_eq!((url.as_str(), depth), ("http://a/", 0));
        assert!(state.mark_visited(&url));
        assert!(!state.mark_visited(&url));
        assert!(!state.enqueue(url, 3));
        assert_eq!(state.pending(), 1);
        assert!(state.is_visited("http://a/"));
        assert!(!state.is_visited("http://a/b"));
    }
}
