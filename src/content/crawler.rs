//! Walks the file tree of a release and warms every artifact in it

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use semver::Version;
use tracing::{debug, error, info};

use crate::config::WARM_CONCURRENCY;
use crate::error::UpstreamError;
use crate::release::source::{ReleaseSource, TreeEntryKind};

/// Counters of one crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub warmed: usize,
    pub failed: usize,
    /// Directories, submodules and entries without a path
    pub skipped: usize,
}

pub struct WarmCacheCrawler {
    source: Arc<dyn ReleaseSource>,
    concurrency: usize,
}

impl WarmCacheCrawler {
    pub fn new(source: Arc<dyn ReleaseSource>) -> Self {
        Self {
            source,
            concurrency: WARM_CONCURRENCY,
        }
    }

    /// Number of artifacts warmed at the same time
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Calls `on_each("/<path>", version)` for every file of `docs/v<version>`.
    ///
    /// Files of a page are warmed concurrently. A failing page aborts the
    /// crawl. Failures of `on_each` are logged and counted, and the crawl goes
    /// on.
    pub async fn crawl<F, Fut, E>(
        &self,
        version: &Version,
        on_each: F,
    ) -> Result<CrawlReport, UpstreamError>
    where
        F: Fn(String, Version) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        let tag = format!("v{version}");
        let mut report = CrawlReport::default();
        let mut cursor = None;

        loop {
            let page = self.source.list_tree(&tag, cursor).await?;
            debug!("Crawling {} entries of {}", page.items.len(), tag);

            let (blobs, others): (Vec<_>, Vec<_>) = page
                .items
                .into_iter()
                .partition(|entry| entry.kind == TreeEntryKind::Blob && !entry.path.is_empty());
            report.skipped += others.len();

            let results: Vec<_> = stream::iter(blobs)
                .map(|entry| {
                    let path = format!("/{}", entry.path);
                    let warm = on_each(path.clone(), version.clone());
                    async move { (path, warm.await) }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

            for (path, result) in results {
                match result {
                    Ok(()) => report.warmed += 1,
                    Err(e) => {
                        error!("Failed to warm {} of {}: {}", path, tag, e);
                        report.failed += 1;
                    }
                }
            }

            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        info!(
            "Crawled {}: {} warmed, {} failed, {} skipped",
            tag, report.warmed, report.failed, report.skipped
        );
        Ok(report)
    }
}
