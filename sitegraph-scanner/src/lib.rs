pub mod checker;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod result;

pub use checker::LinkChecker;
pub use crawler::{CrawlState, Crawler, ProgressCallback};
pub use error::ScanError;
pub use extract::{DocumentExtractor, HtmlExtractor};
pub use fetch::PageFetcher;
pub use normalize::SiteOrigin;
pub use result::{CrawlResult, CrawlSummary, LinkCheckResult, Page};
