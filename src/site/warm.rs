//! Cache warming for the latest release

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use crate::content::{ContentCache, ContentRequest, CrawlReport, WarmCacheCrawler};
use crate::error::WarmError;
use crate::release::{ReleaseRegistry, ResolvedTarget};

/// Refreshes the release snapshot and refetches every file of latest
///
/// Returns once all cache writes have landed.
pub async fn warm_latest(
    registry: &ReleaseRegistry,
    crawler: &WarmCacheCrawler,
    content: &ContentCache,
) -> Result<CrawlReport, WarmError> {
    let snapshot = registry.update().await?;
    let latest = snapshot.latest;
    info!("Warming cache for {}", latest);

    let request = ContentRequest::warm();
    let crawl = crawler
        .crawl(&latest, |path, version| {
            let request = &request;
            async move {
                let resolved = ResolvedTarget::latest(version);
                content.serve(request, &resolved, &path).await.map(|_| ())
            }
        })
        .await;

    let written = content.settle().await;
    info!("Settled {} cache writes", written);

    crawl.map_err(|source| WarmError::Crawl {
        tag: format!("v{latest}"),
        source,
    })
}

/// Runs [`warm_latest`] every `period`, starting immediately
pub fn spawn_periodic(
    registry: Arc<ReleaseRegistry>,
    crawler: Arc<WarmCacheCrawler>,
    content: Arc<ContentCache>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = warm_latest(&registry, &crawler, &content).await {
                error!("Scheduled cache warm failed: {}", e);
            }
        }
    })
}
