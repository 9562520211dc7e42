use crate::config::AuditConfig;
use crate::error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use sitegraph_scanner::checker::LinkChecker;
use sitegraph_scanner::fetch::PageFetcher;
use sitegraph_scanner::result::{CrawlResult, LinkCheckResult};
use sitegraph_scanner::{Crawler, ProgressCallback};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing::info;
use url::Url;

/// Options for configuring a crawl operation
#[derive(Clone)]
pub struct CrawlOptions {
    pub url: String,
    pub max_depth: usize,
    pub max_pages: usize,
    pub check_external: bool,
    pub delay: Duration,
    pub link_check_concurrency: usize,
    pub page_timeout: Duration,
    pub probe_timeout: Duration,
    pub user_agent: String,
    pub show_progress_bars: bool,
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl CrawlOptions {
    pub fn from_config(url: &str, config: &AuditConfig, default_max_pages: usize) -> Self {
        Self {
            url: url.to_string(),
            max_depth: config.max_depth,
            max_pages: config.max_pages_or(default_max_pages),
            check_external: config.check_external,
            delay: Duration::from_millis(config.delay_ms),
            link_check_concurrency: config.link_check_concurrency,
            page_timeout: Duration::from_secs(config.page_timeout_secs),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
            user_agent: config.user_agent.clone(),
            show_progress_bars: false,
            cancel_flag: None,
        }
    }
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

fn spinner(show: bool, message: &str) -> Option<Arc<ProgressBar>> {
    if !show {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    Some(Arc::new(pb))
}

pub fn build_crawler(options: &CrawlOptions) -> Result<Crawler> {
    let fetcher = PageFetcher::with_settings(&options.user_agent, options.page_timeout)?;
    let checker = LinkChecker::with_settings(&options.user_agent, options.probe_timeout)?
        .with_concurrency(options.link_check_concurrency);

    let mut crawler = Crawler::with_clients(fetcher, checker)
        .with_max_depth(options.max_depth)
        .with_max_pages(options.max_pages)
        .with_delay(options.delay)
        .with_check_external(options.check_external);
    if let Some(flag) = &options.cancel_flag {
        crawler = crawler.with_cancel_flag(flag.clone());
    }
    Ok(crawler)
}

/// Execute a crawl with the given options
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlResult> {
    let progress_bar = spinner(options.show_progress_bars, "Starting crawl...");

    let pb_clone = progress_bar.clone();
    let callback = progress_callback.clone();
    let max_pages = options.max_pages;
    let internal_progress: ProgressCallback = Arc::new(move |done: usize, url: String| {
        let message = format!("[{}/{}] {}", done + 1, max_pages, extract_url_path(&url));
        if let Some(ref pb) = pb_clone {
            pb.set_message(format!("Crawling {}", message));
        }
        if let Some(ref cb) = callback {
            cb(message);
        }
    });

    let crawler = build_crawler(&options)?.with_progress_callback(internal_progress);
    let outcome = crawler.crawl(&options.url).await;

    if let Some(ref pb) = progress_bar {
        match &outcome {
            Ok(result) => pb.finish_with_message(format!(
                "Crawl complete! {} pages, {} broken links",
                result.summary.total_pages, result.summary.total_broken_links
            )),
            Err(_) => pb.finish_and_clear(),
        }
    }

    let result = outcome?;
    info!(
        "Crawled {} pages from {} ({} failed)",
        result.summary.total_pages, result.start_url, result.summary.failed_pages
    );
    Ok(result)
}

/// Probe a list of URLs for brokenness using the configured concurrency and timeout.
pub async fn execute_link_check(
    urls: &[String],
    config: &AuditConfig,
    show_progress_bars: bool,
) -> Result<Vec<LinkCheckResult>> {
    let checker = LinkChecker::with_settings(
        &config.user_agent,
        Duration::from_secs(config.probe_timeout_secs),
    )?
    .with_concurrency(config.link_check_concurrency);

    let progress_bar = spinner(
        show_progress_bars,
        &format!(
            "Checking {} links in {} batches...",
            urls.len(),
            checker.batch_count(urls.len())
        ),
    );

    let results = checker.check_all(urls).await;

    if let Some(pb) = progress_bar {
        let broken = results.iter().filter(|r| r.broken).count();
        pb.finish_with_message(format!("Checked {} links, {} broken", results.len(), broken));
    }

    Ok(results)
}
