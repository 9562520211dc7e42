pub mod audit;
pub mod config;
pub mod crawl;
pub mod depth;
pub mod distribution;
pub mod error;
pub mod map;
pub mod model;
pub mod rank;
pub mod report;
pub mod suggest;

pub use audit::{LinkAnalysis, SiteAudit, analyze_links, run_audit};
pub use config::AuditConfig;
pub use error::CoreError;
pub use map::LinkGraph;
