//! Serving and warming documentation artifacts
//!
//! - [`cache`]: Cache-aside serving with index fallback and error pages
//! - [`crawler`]: Release tree walker used to warm the cache
//! - [`fetcher`]: Raw artifact fetching and upstream URL building
//! - [`headers`]: Content types and hardening headers
//! - [`response`]: Server-independent response type
//! - [`ttl`]: Freshness classes

pub mod cache;
pub mod crawler;
pub mod fetcher;
pub mod headers;
pub mod response;
pub mod ttl;

pub use cache::{ContentCache, ContentRequest, FetchMode};
pub use crawler::{CrawlReport, WarmCacheCrawler};
pub use fetcher::{ArtifactFetcher, Locator, RawGitHubFetcher};
pub use response::DocsResponse;
