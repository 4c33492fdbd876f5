//! Wiring of the services shared by the server and the warmer

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::SiteConfig;
use crate::content::{
    ArtifactFetcher, ContentCache, CrawlReport, Locator, RawGitHubFetcher, WarmCacheCrawler,
};
use crate::error::WarmError;
use crate::release::ReleaseRegistry;
use crate::release::github::GitHubSource;
use crate::release::source::ReleaseSource;
use crate::site::{DocsSite, SiteRouter, warm};
use crate::store::SqliteStore;

pub struct EdgeServices {
    pub registry: Arc<ReleaseRegistry>,
    pub content: Arc<ContentCache>,
    pub crawler: Arc<WarmCacheCrawler>,
}

impl EdgeServices {
    pub fn new(
        source: Arc<dyn ReleaseSource>,
        fetcher: Arc<dyn ArtifactFetcher>,
        store: Arc<SqliteStore>,
        locator: Locator,
    ) -> Self {
        let registry = Arc::new(ReleaseRegistry::new(source.clone(), store.clone()));
        let content = Arc::new(ContentCache::new(
            registry.clone(),
            fetcher,
            store,
            locator,
        ));
        Self {
            registry,
            content,
            crawler: Arc::new(WarmCacheCrawler::new(source)),
        }
    }

    /// GitHub backed services
    pub fn from_config(config: &SiteConfig, store: Arc<SqliteStore>) -> Self {
        Self::new(
            Arc::new(GitHubSource::from_config(&config.upstream)),
            Arc::new(RawGitHubFetcher::from_config(&config.upstream)),
            store,
            Locator::from_config(&config.upstream),
        )
    }

    pub fn router(&self) -> SiteRouter<DocsSite> {
        SiteRouter::new(DocsSite::new(self.registry.clone(), self.content.clone()))
    }

    pub async fn warm(&self) -> Result<CrawlReport, WarmError> {
        warm::warm_latest(&self.registry, &self.crawler, &self.content).await
    }

    pub fn spawn_warmer(&self, period: Duration) -> JoinHandle<()> {
        warm::spawn_periodic(
            self.registry.clone(),
            self.crawler.clone(),
            self.content.clone(),
            period,
        )
    }
}
