use crate::error::{Result, ScanError};
use crate::result::{Failure, FailureKind, RedirectHop};
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Client, Method, Response};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; sitegraph-bot/",
    env!("CARGO_PKG_VERSION"),
    "; +https://github.com/trapdoorsec/sitegraph)"
);
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_REDIRECTS: usize = 10;

/// Build a client that never follows redirects on its own; callers walk them
/// with [`follow_redirects`] so every hop can be reported.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout / 2)
        .pool_max_idle_per_host(50)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| ScanError::ClientBuild(e.to_string()))
}

pub(crate) struct RedirectError {
    pub failure: Failure,
    pub hops: Vec<RedirectHop>,
}

/// Issue `method` against `start`, following 3xx responses that carry a
/// `location` header until a non-redirect response arrives or `max_hops` is exceeded.
pub(crate) async fn follow_redirects(
    client: &Client,
    method: Method,
    start: &Url,
    max_hops: usize,
) -> std::result::Result<(Response, Vec<RedirectHop>), RedirectError> {
    let mut current = start.clone();
    let mut hops: Vec<RedirectHop> = Vec::new();

    loop {
        let response = match client.request(method.clone(), current.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                return Err(RedirectError {
                    failure: Failure::from_reqwest(&e),
                    hops,
                });
            }
        };

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let Some(location) = location.filter(|_| status.is_redirection()) else {
            return Ok((response, hops));
        };

        if hops.len() >= max_hops {
            return Err(RedirectError {
                failure: Failure::new(
                    FailureKind::TooManyRedirects,
                    format!("Too many redirects (more than {})", max_hops),
                ),
                hops,
            });
        }

        let mut next = match current.join(&location) {
            Ok(next) => next,
            Err(e) => {
                return Err(RedirectError {
                    failure: Failure::new(
                        FailureKind::InvalidRedirect,
                        format!("Invalid redirect location '{}': {}", location, e),
                    ),
                    hops,
                });
            }
        };
        next.set_fragment(None);

        debug!("{} {} -> {}", status.as_u16(), current, next);
        hops.push(RedirectHop {
            from: current.to_string(),
            to: next.to_string(),
            status: status.as_u16(),
        });
        current = next;
    }
}

/// A single page fetch. Failures are carried in `error`, never returned as `Err`.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub requested_url: String,
    pub final_url: String,
    pub status: u16,
    pub status_text: String,
    pub content_type: Option<String>,
    pub body: String,
    pub load_time: Duration,
    pub redirects: Vec<RedirectHop>,
    pub error: Option<Failure>,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("text/html") || ct.contains("application/xhtml"))
    }
}

#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    max_redirects: usize,
}

impl PageFetcher {
    pub fn new() -> Result<Self> {
        Self::with_settings(DEFAULT_USER_AGENT, PAGE_TIMEOUT)
    }

    pub fn with_settings(user_agent: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(user_agent, timeout)?,
            max_redirects: MAX_REDIRECTS,
        })
    }

    pub async fn fetch(&self, url: &str) -> FetchedPage {
        let start = Instant::now();
        let mut page = FetchedPage {
            requested_url: url.to_string(),
            final_url: url.to_string(),
            status: 0,
            status_text: String::new(),
            content_type: None,
            body: String::new(),
            load_time: Duration::ZERO,
            redirects: Vec::new(),
            error: None,
        };

        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                page.error = Some(Failure::new(FailureKind::InvalidUrl, e.to_string()));
                page.status_text = "Invalid URL".to_string();
                return page;
            }
        };

        debug!("Fetching {}", url);
        match follow_redirects(&self.client, Method::GET, &parsed, self.max_redirects).await {
            Ok((response, hops)) => {
                page.final_url = response.url().to_string();
                page.status = response.status().as_u16();
                page.status_text = response
                    .status()
                    .canonical_reason()
                    .unwrap_or_default()
                    .to_string();
                page.content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                page.redirects = hops;

                // Only successful HTML pages are parsed for links.
                if !page.is_success() || !page.is_html() {
                    debug!("Skipping body of {} ({:?})", page.final_url, page.content_type);
                    page.load_time = start.elapsed();
                    return page;
                }

                match response.text().await {
                    Ok(body) => page.body = body,
                    Err(e) => {
                        let failure = Failure::from_reqwest(&e);
                        page.error = Some(if failure.is_timeout() {
                            failure
                        } else {
                            Failure::new(FailureKind::Body, e.to_string())
                        });
                    }
                }
            }
            Err(RedirectError { failure, hops }) => {
                if let Some(last) = hops.last() {
                    page.final_url = last.to.clone();
                }
                page.status_text = failure.message.clone();
                page.error = Some(failure);
                page.redirects = hops;
            }
        }

        page.load_time = start.elapsed();
        page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[tokio::test]
    async fn test_fetch_follows_redirects_manually() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/middle"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/middle"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/new#frag"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><title>New</title></html>", "text/html; charset=utf-8"),
            )
            .mount(&mock_server)
            .await;

        let fetcher = PageFetcher::new().unwrap();
        let page = fetcher.fetch(&format!("{}/old", mock_server.uri())).await;

        assert_eq!(page.status, 200);
        assert_eq!(page.status_text, "OK");
        assert!(page.is_success());
        assert!(page.is_html());
        assert!(page.error.is_none());
        assert_eq!(page.final_url, format!("{}/new", mock_server.uri()));
        assert_eq!(page.redirects.len(), 2);
        assert_eq!(page.redirects[0].status, 301);
        assert_eq!(page.redirects[1].status, 302);
        assert_eq!(page.redirects[1].to, page.final_url);
        assert!(page.body.contains("New"));
    }

    #[tokio::test]
    async fn test_fetch_skips_non_html_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/report.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                b"%PDF-1.7 <a href=\"/hidden\">x</a>".to_vec(),
                "application/pdf",
            ))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/plain"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<a href=\"/x\">x</a>"))
            .mount(&mock_server)
            .await;

        let fetcher = PageFetcher::new().unwrap();
        for route in ["/report.pdf", "/plain"] {
            let page = fetcher.fetch(&format!("{}{}", mock_server.uri(), route)).await;

            assert_eq!(page.status, 200);
            assert!(page.error.is_none());
            assert!(!page.is_html());
            assert!(page.body.is_empty());
        }
    }

    #[tokio::test]
    async fn test_fetch_redirect_loop_is_capped() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
            .mount(&mock_server)
            .await;

        let fetcher = PageFetcher::new().unwrap();
        let page = fetcher.fetch(&format!("{}/loop", mock_server.uri())).await;

        assert_eq!(page.status, 0);
        assert_eq!(page.redirects.len(), MAX_REDIRECTS);
        assert_eq!(
            page.error.map(|e| e.kind),
            Some(FailureKind::TooManyRedirects)
        );
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_distinguished() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&mock_server)
            .await;

        let fetcher =
            PageFetcher::with_settings(DEFAULT_USER_AGENT, Duration::from_millis(200)).unwrap();
        let page = fetcher.fetch(&format!("{}/slow", mock_server.uri())).await;

        assert_eq!(page.status, 0);
        assert!(page.error.as_ref().is_some_and(Failure::is_timeout));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host() {
        let fetcher =
            PageFetcher::with_settings(DEFAULT_USER_AGENT, Duration::from_secs(2)).unwrap();
        // Port 9 (discard) on loopback is not expected to be listening.
        let page = fetcher.fetch("http://127.0.0.1:9/").await;

        assert_eq!(page.status, 0);
        assert!(page.error.is_some());
    }
}
