//! HTML extraction behind a small trait so the crawler never touches markup directly.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("static selector"));
static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));
static HEADING_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").expect("static selector"));
static IMAGE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("static selector"));
static ALT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[alt]").expect("static selector"));

/// An anchor as written in the markup, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLink {
    pub href: String,
    pub text: String,
    /// Lowercased `rel` tokens.
    pub rel: Vec<String>,
}

impl RawLink {
    pub fn is_nofollow(&self) -> bool {
        self.rel.iter().any(|r| r == "nofollow")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub src: String,
    pub alt: Option<String>,
}

/// What the crawler needs from a page body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageDocument {
    pub title: Option<String>,
    pub links: Vec<RawLink>,
}

pub trait DocumentExtractor: Send + Sync {
    fn extract_title(&self, html: &str) -> Option<String>;
    fn extract_links(&self, html: &str) -> Vec<RawLink>;
    fn extract_headings(&self, html: &str) -> Vec<Heading>;
    fn extract_images(&self, html: &str) -> Vec<Image>;

    fn extract_page(&self, html: &str) -> PageDocument {
        PageDocument {
            title: self.extract_title(html),
            links: self.extract_links(html),
        }
    }
}

/// DOM-backed extractor using `scraper`'s html5ever parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }

    fn title_of(document: &Html) -> Option<String> {
        document
            .select(&TITLE_SELECTOR)
            .next()
            .map(collapsed_text)
            .filter(|t| !t.is_empty())
    }

    fn links_of(document: &Html) -> Vec<RawLink> {
        document
            .select(&LINK_SELECTOR)
            .filter_map(|element| {
                let href = element.value().attr("href")?.trim().to_string();
                let mut text = collapsed_text(element);
                if text.is_empty() {
                    // Image links carry their text in the alt attribute.
                    text = element
                        .select(&ALT_SELECTOR)
                        .filter_map(|img| img.value().attr("alt"))
                        .map(str::trim)
                        .find(|alt| !alt.is_empty())
                        .unwrap_or_default()
                        .to_string();
                }
                let rel = element
                    .value()
                    .attr("rel")
                    .map(|rel| rel.split_whitespace().map(str::to_ascii_lowercase).collect())
                    .unwrap_or_default();
                Some(RawLink { href, text, rel })
            })
            .collect()
    }
}

impl DocumentExtractor for HtmlExtractor {
    fn extract_title(&self, html: &str) -> Option<String> {
        Self::title_of(&Html::parse_document(html))
    }

    fn extract_links(&self, html: &str) -> Vec<RawLink> {
        Self::links_of(&Html::parse_document(html))
    }

    fn extract_headings(&self, html: &str) -> Vec<Heading> {
        let document = Html::parse_document(html);
        document
            .select(&HEADING_SELECTOR)
            .filter_map(|element| {
                let level = element.value().name().strip_prefix('h')?.parse().ok()?;
                Some(Heading {
                    level,
                    text: collapsed_text(element),
                })
            })
            .collect()
    }

    fn extract_images(&self, html: &str) -> Vec<Image> {
        let document = Html::parse_document(html);
        document
            .select(&IMAGE_SELECTOR)
            .filter_map(|element| {
                let src = element.value().attr("src")?.trim().to_string();
                let alt = element.value().attr("alt").map(|a| a.trim().to_string());
                Some(Image { src, alt })
            })
            .collect()
    }

    fn extract_page(&self, html: &str) -> PageDocument {
        let document = Html::parse_document(html);
        PageDocument {
            title: Self::title_of(&document),
            links: Self::links_of(&document),
        }
    }
}

fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html>
        <head><title>
            Widgets &amp; Co
        </title></head>
        <body>
            <h1>Widgets</h1>
            <h3>  Small   widgets </h3>
            <a href="/about">About
                us</a>
            <a href="https://partner.org" rel="NoFollow sponsored">Partner</a>
            <a href="/gallery"><img src="/g.png" alt="Gallery"></a>
            <a name="anchor-without-href">nothing</a>
            <img src="/logo.png">
        </body></html>"#;

    #[test]
    fn test_extract_title() {
        assert_eq!(HtmlExtractor.extract_title(PAGE), Some("Widgets & Co".to_string()));
        assert_eq!(HtmlExtractor.extract_title("<html><body></body></html>"), None);
    }

    #[test]
    fn test_extract_links() {
        let links = HtmlExtractor.extract_links(PAGE);
        assert_eq!(links.len(), 3);

        assert_eq!(links[0].href, "/about");
        assert_eq!(links[0].text, "About us");
        assert!(!links[0].is_nofollow());

        assert_eq!(links[1].rel, vec!["nofollow".to_string(), "sponsored".to_string()]);
        assert!(links[1].is_nofollow());

        assert_eq!(links[2].text, "Gallery");
    }

    #[test]
    fn test_extract_headings_and_images() {
        let headings = HtmlExtractor.extract_headings(PAGE);
        assert_eq!(
            headings,
            vec![
                Heading { level: 1, text: "Widgets".to_string() },
                Heading { level: 3, text: "Small widgets".to_string() },
            ]
        );

        let images = HtmlExtractor.extract_images(PAGE);
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].alt.as_deref(), Some("Gallery"));
        assert_eq!(images[1].src, "/logo.png");
        assert_eq!(images[1].alt, None);
    }

    #[test]
    fn test_malformed_markup() {
        let html = r#"<a href="/one">One<a href="/two">Two</p></div><a href='/three'>"#;
        let hrefs: Vec<_> = HtmlExtractor
            .extract_links(html)
            .into_iter()
            .map(|l| l.href)
            .collect();
        assert_eq!(hrefs, vec!["/one", "/two", "/three"]);
    }

    #[test]
    fn test_extract_page_matches_individual_calls() {
        let doc = HtmlExtractor.extract_page(PAGE);
        assert_eq!(doc.title, HtmlExtractor.extract_title(PAGE));
        assert_eq!(doc.links, HtmlExtractor.extract_links(PAGE));
    }
}
