use crate::error::{Result, ScanError};
use url::Url;

/// Parse and validate a crawl seed. Only absolute http(s) URLs with a host are accepted.
pub fn parse_seed(input: &str) -> Result<Url> {
    let mut url = Url::parse(input.trim())
        .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", input, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ScanError::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            input,
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ScanError::InvalidUrl(format!("{}: missing host", input)));
    }

    url.set_fragment(None);
    Ok(url)
}

/// Resolve `href` against the page it was found on.
///
/// Returns `None` for script, mail, phone and same-page fragment links, and for
/// anything that does not resolve to an http(s) URL. The fragment is always stripped.
pub fn normalize_link(href: &str, page_url: &Url) -> Option<Url> {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();
    if href.is_empty()
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let mut resolved = page_url.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkScope {
    Internal,
    External,
}

/// The scheme, host and port a crawl is confined to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteOrigin {
    prefix: String,
}

impl SiteOrigin {
    pub fn new(seed: &Url) -> Result<Self> {
        let origin = seed.origin();
        if !origin.is_tuple() {
            return Err(ScanError::InvalidUrl(format!("{}: no usable origin", seed)));
        }
        Ok(Self {
            prefix: origin.ascii_serialization(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    /// Prefix comparison against the origin, bounded so that `http://a.com`
    /// does not claim `http://a.com.evil.net`.
    pub fn is_internal(&self, url: &str) -> bool {
        url.strip_prefix(&self.prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?']))
    }

    pub fn classify(&self, url: &str) -> LinkScope {
        if self.is_internal(url) {
            LinkScope::Internal
        } else {
            LinkScope::External
        }
    }
}
