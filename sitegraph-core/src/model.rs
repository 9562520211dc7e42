use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Coarse page role inferred from the URL path alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Homepage,
    Blog,
    Product,
    Category,
    Information,
    Generic,
}

const BLOG_SEGMENTS: &[&str] = &["blog", "blogs", "news", "article", "articles", "post", "posts"];
const PRODUCT_SEGMENTS: &[&str] = &["product", "products", "shop", "store", "item", "items", "p"];
const CATEGORY_SEGMENTS: &[&str] = &[
    "category",
    "categories",
    "collection",
    "collections",
    "tag",
    "tags",
    "c",
];
const INFORMATION_SEGMENTS: &[&str] = &[
    "about",
    "about-us",
    "contact",
    "contact-us",
    "faq",
    "help",
    "support",
    "privacy",
    "privacy-policy",
    "terms",
    "legal",
];

impl PageType {
    pub fn from_url(url: &str) -> Self {
        let Ok(parsed) = Url::parse(url) else {
            return PageType::Generic;
        };
        let path = parsed.path().to_ascii_lowercase();
        let path = path.trim_end_matches('/');

        if path.is_empty()
            || matches!(path, "/index.html" | "/index.htm" | "/index.php" | "/home")
        {
            return PageType::Homepage;
        }

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let has_any = |names: &[&str]| segments.iter().any(|s| names.contains(s));

        if has_any(BLOG_SEGMENTS) {
            PageType::Blog
        } else if has_any(PRODUCT_SEGMENTS) {
            PageType::Product
        } else if has_any(CATEGORY_SEGMENTS) {
            PageType::Category
        } else if has_any(INFORMATION_SEGMENTS) {
            PageType::Information
        } else {
            PageType::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::Homepage => "homepage",
            PageType::Blog => "blog",
            PageType::Product => "product",
            PageType::Category => "category",
            PageType::Information => "information",
            PageType::Generic => "generic",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Follow,
    Nofollow,
}

impl LinkKind {
    pub fn from_nofollow(nofollow: bool) -> Self {
        if nofollow {
            LinkKind::Nofollow
        } else {
            LinkKind::Follow
        }
    }
}

/// Ordered so that sorting puts `High` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
