use crate::error::Result;
use crate::fetch::{DEFAULT_USER_AGENT, MAX_REDIRECTS, RedirectError, build_client, follow_redirects};
use crate::result::{Failure, FailureKind, LinkCheckResult, RedirectHop, is_broken_status};
use futures::future::join_all;
use reqwest::{Client, Method, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Probes URLs for brokenness in sequential batches of `concurrency`.
#[derive(Debug, Clone)]
pub struct LinkChecker {
    client: Client,
    timeout: Duration,
    max_redirects: usize,
    concurrency: usize,
}

impl LinkChecker {
    pub fn new() -> Result<Self> {
        Self::with_settings(DEFAULT_USER_AGENT, PROBE_TIMEOUT)
    }

    pub fn with_settings(user_agent: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(user_agent, timeout)?,
            timeout,
            max_redirects: MAX_REDIRECTS,
            concurrency: DEFAULT_CONCURRENCY,
        })
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Number of sequential batches needed for `n` URLs.
    pub fn batch_count(&self, n: usize) -> usize {
        n.div_ceil(self.concurrency)
    }

    /// One result per input URL, in input order. A batch completes in full
    /// before the next one starts, so at most `concurrency` probes are in flight.
    pub async fn check_all(&self, urls: &[String]) -> Vec<LinkCheckResult> {
        let batches = self.batch_count(urls.len());
        info!(
            "Checking {} links in {} batches of up to {}",
            urls.len(),
            batches,
            self.concurrency
        );

        let mut results = Vec::with_capacity(urls.len());
        for (batch_no, batch) in urls.chunks(self.concurrency).enumerate() {
            debug!("Link check batch {}/{} ({} urls)", batch_no + 1, batches, batch.len());
            let probes = batch.iter().map(|url| self.check(url));
            results.extend(join_all(probes).await);
        }

        let broken = results.iter().filter(|r| r.broken).count();
        info!("Link check complete: {} broken of {}", broken, results.len());
        results
    }

    /// Probe a single URL. Never fails: timeouts and network errors become broken results.
    pub async fn check(&self, url: &str) -> LinkCheckResult {
        let start = Instant::now();
        match tokio::time::timeout(self.timeout, self.probe(url, start)).await {
            Ok(result) => result,
            Err(_) => {
                debug!("Probe of {} timed out after {:?}", url, self.timeout);
                LinkCheckResult::failed(url, Vec::new(), Failure::timeout(), elapsed_ms(start))
            }
        }
    }

    async fn probe(&self, url: &str, start: Instant) -> LinkCheckResult {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                return LinkCheckResult::failed(
                    url,
                    Vec::new(),
                    Failure::new(FailureKind::InvalidUrl, e.to_string()),
                    elapsed_ms(start),
                );
            }
        };

        let mut outcome =
            follow_redirects(&self.client, Method::HEAD, &parsed, self.max_redirects).await;

        // Some servers refuse HEAD outright; ask again with GET from where HEAD ended up.
        let retry = match &outcome {
            Ok((response, hops))
                if matches!(
                    response.status(),
                    StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
                ) =>
            {
                Some((response.url().clone(), hops.clone()))
            }
            _ => None,
        };
        if let Some((retry_from, mut hops)) = retry {
            debug!("HEAD refused by {}, retrying with GET", retry_from);
            let remaining = self.max_redirects.saturating_sub(hops.len());
            outcome = match follow_redirects(&self.client, Method::GET, &retry_from, remaining).await
            {
                Ok((response, more)) => {
                    hops.extend(more);
                    Ok((response, hops))
                }
                Err(RedirectError { failure, hops: more }) => {
                    hops.extend(more);
                    Err(RedirectError { failure, hops })
                }
            };
        }

        match outcome {
            Ok((response, hops)) => {
                let status = response.status();
                let chain = redirect_chain(url, &hops);
                LinkCheckResult {
                    url: url.to_string(),
                    final_url: response.url().to_string(),
                    status: status.as_u16(),
                    status_text: status.canonical_reason().unwrap_or_default().to_string(),
                    redirect_count: hops.len(),
                    redirect_chain: chain,
                    broken: is_broken_status(status.as_u16()),
                    error: None,
                    response_time_ms: elapsed_ms(start),
                }
            }
            Err(RedirectError { failure, hops }) => LinkCheckResult::failed(
                url,
                redirect_chain(url, &hops),
                failure,
                elapsed_ms(start),
            ),
        }
    }
}

fn redirect_chain(url: &str, hops: &[RedirectHop]) -> Vec<String> {
    std::iter::once(url.to_string())
        .chain(hops.iter().map(|hop| hop.to.clone()))
        .collect()
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
