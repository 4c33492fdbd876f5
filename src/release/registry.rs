//! Registry of released documentation versions
//!
//! The registry persists a denormalized snapshot into the shared [`KvStore`]:
//! the latest release under [`LATEST_KEY`] and every known version, sorted
//! newest first, under [`SORTED_KEY`]. Both expire after
//! [`RELEASE_SNAPSHOT_TTL`], so readers rebuild the snapshot from upstream
//! whenever they find it absent.

use std::sync::Arc;
use std::time::Duration;

use semver::Version;
use tracing::{debug, info, warn};

use crate::config::{MAX_REGISTRY_ATTEMPTS, RELEASE_SNAPSHOT_TTL};
use crate::error::RegistryError;
use crate::release::source::ReleaseSource;
use crate::release::target::{parse_docs_ref, parse_version};
use crate::store::KvStore;

pub const LATEST_KEY: &str = "release-latest";
pub const SORTED_KEY: &str = "releases-sorted";

/// Latest release plus every known version (newest first, prereleases included)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSnapshot {
    pub latest: Version,
    pub all: Vec<Version>,
}

impl ReleaseSnapshot {
    /// Builds a snapshot from parsed tag versions.
    ///
    /// Returns None when no non-prerelease version exists.
    pub fn from_versions(versions: impl IntoIterator<Item = Version>) -> Option<Self> {
        let mut all: Vec<Version> = versions.into_iter().collect();
        // newest first; equal versions collapse into one entry
        all.sort_by(|a, b| b.cmp(a));
        all.dedup();

        let latest = all.iter().find(|v| v.pre.is_empty())?.clone();

        Some(Self { latest, all })
    }
}

pub struct ReleaseRegistry {
    source: Arc<dyn ReleaseSource>,
    store: Arc<dyn KvStore>,
    snapshot_ttl: Duration,
    max_attempts: usize,
}

impl ReleaseRegistry {
    pub fn new(source: Arc<dyn ReleaseSource>, store: Arc<dyn KvStore>) -> Self {
        Self {
            source,
            store,
            snapshot_ttl: RELEASE_SNAPSHOT_TTL,
            max_attempts: MAX_REGISTRY_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Re-enumerates the docs tags upstream and persists a fresh snapshot
    pub async fn update(&self) -> Result<ReleaseSnapshot, RegistryError> {
        let mut versions = Vec::new();
        let mut cursor = None;
        let mut skipped = 0usize;

        loop {
            let page = self.source.list_tags(cursor).await?;
            for reference in &page.items {
                match parse_docs_ref(reference) {
                    Some(version) => versions.push(version),
                    None => {
                        debug!("Ignoring tag {}", reference);
                        skipped += 1;
                    }
                }
            }
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        let snapshot =
            ReleaseSnapshot::from_versions(versions).ok_or(RegistryError::NoRelease)?;

        info!(
            "Found {} documentation versions (latest: {}, ignored tags: {})",
            snapshot.all.len(),
            snapshot.latest,
            skipped
        );

        self.persist(&snapshot).await;

        Ok(snapshot)
    }

    async fn persist(&self, snapshot: &ReleaseSnapshot) {
        let latest = snapshot.latest.to_string();
        let _ = self
            .store
            .put(LATEST_KEY, &latest, self.snapshot_ttl)
            .await
            .inspect_err(|e| warn!("Failed to store {}: {}", LATEST_KEY, e));

        let sorted: Vec<String> = snapshot.all.iter().map(|v| v.to_string()).collect();
        match serde_json::to_string(&sorted) {
            Ok(sorted) => {
                let _ = self
                    .store
                    .put(SORTED_KEY, &sorted, self.snapshot_ttl)
                    .await
                    .inspect_err(|e| warn!("Failed to store {}: {}", SORTED_KEY, e));
            }
            Err(e) => warn!("Failed to encode {}: {}", SORTED_KEY, e),
        }
    }

    /// Returns the latest release
    pub async fn latest(&self) -> Result<Version, RegistryError> {
        self.read_healing(LATEST_KEY, parse_version).await
    }

    /// Returns every known version, newest first
    pub async fn all(&self) -> Result<Vec<Version>, RegistryError> {
        self.read_healing(SORTED_KEY, |raw| {
            serde_json::from_str::<Vec<String>>(raw)
                .ok()?
                .iter()
                .map(|v| parse_version(v))
                .collect()
        })
        .await
    }

    /// Whether the version is among the known versions
    pub async fn has(&self, version: &Version) -> Result<bool, RegistryError> {
        let all = self.all().await?;
        Ok(all.contains(version))
    }

    pub async fn snapshot(&self) -> Result<ReleaseSnapshot, RegistryError> {
        let latest = self.latest().await?;
        let all = self.all().await?;
        Ok(ReleaseSnapshot { latest, all })
    }

    /// Reads a snapshot key, rebuilding the snapshot from upstream when the
    /// key is absent, at most `max_attempts` times.
    async fn read_healing<T>(
        &self,
        key: &'static str,
        decode: impl Fn(&str) -> Option<T>,
    ) -> Result<T, RegistryError> {
        for attempt in 1..=self.max_attempts {
            let stored = self
                .store
                .get(key)
                .await
                .inspect_err(|e| warn!("Failed to read {}: {}", key, e))
                .ok()
                .flatten();

            if let Some(raw) = stored {
                match decode(&raw) {
                    Some(value) => return Ok(value),
                    None => warn!("Ignoring unreadable {} value: {:?}", key, raw),
                }
            }

            debug!("{} absent (attempt {}), updating releases", key, attempt);
            self.update().await?;
        }

        Err(RegistryError::Exhausted {
            key,
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use crate::release::source::{MockReleaseSource, Page, PageCursor};
    use crate::store::{MockKvStore, SqliteStore};
    use mockall::predicate::eq;
    use rstest::rstest;

    fn v(raw: &str) -> Version {
        Version::parse(raw).unwrap()
    }

    fn source_with_tags(pages: Vec<Vec<&'static str>>) -> MockReleaseSource {
        let mut source = MockReleaseSource::new();
        let count = pages.len();
        for (i, tags) in pages.into_iter().enumerate() {
            let cursor = (i > 0).then(|| PageCursor(format!("page-{}", i + 1)));
            let next = (i + 1 < count).then(|| PageCursor(format!("page-{}", i + 2)));
            source
                .expect_list_tags()
                .with(eq(cursor))
                .returning(move |_| {
                    Ok(Page {
                        items: tags.iter().map(|t| t.to_string()).collect(),
                        next: next.clone(),
                    })
                });
        }
        source
    }

    fn registry(source: MockReleaseSource) -> ReleaseRegistry {
        ReleaseRegistry::new(Arc::new(source), Arc::new(SqliteStore::in_memory().unwrap()))
    }

    #[rstest]
    #[case(vec!["1.0.0", "2.0.0", "1.5.0"], Some("2.0.0"), vec!["2.0.0", "1.5.0", "1.0.0"])]
    #[case(vec!["1.0.0", "2.0.0-beta.1"], Some("1.0.0"), vec!["2.0.0-beta.1", "1.0.0"])]
    #[case(vec!["1.10.0", "1.9.0", "1.9.0"], Some("1.10.0"), vec!["1.10.0", "1.9.0"])]
    #[case(vec!["3.0.0-rc.1"], None, vec![])]
    #[case(vec![], None, vec![])]
    fn snapshot_from_versions(
        #[case] versions: Vec<&str>,
        #[case] latest: Option<&str>,
        #[case] all: Vec<&str>,
    ) {
        let snapshot = ReleaseSnapshot::from_versions(versions.into_iter().map(v));

        assert_eq!(
            snapshot,
            latest.map(|latest| ReleaseSnapshot {
                latest: v(latest),
                all: all.into_iter().map(v).collect(),
            })
        );
    }

    #[tokio::test]
    async fn update_collects_all_pages_and_skips_unparsable_tags() {
        let source = source_with_tags(vec![
            vec![
                "refs/tags/docs/v1.0.0",
                "refs/tags/docs/pr-12",
                "refs/tags/docs/v1.1.0",
            ],
            vec!["refs/tags/docs/v2.0.0-beta.1", "refs/tags/docs/nonsense"],
        ]);
        let registry = registry(source);

        let snapshot = registry.update().await.unwrap();

        assert_eq!(snapshot.latest, v("1.1.0"));
        assert_eq!(snapshot.all, vec![v("2.0.0-beta.1"), v("1.1.0"), v("1.0.0")]);
        assert_eq!(registry.latest().await.unwrap(), v("1.1.0"));
        assert_eq!(registry.all().await.unwrap(), snapshot.all);
    }

    #[tokio::test]
    async fn update_fails_without_any_release() {
        let source = source_with_tags(vec![vec!["refs/tags/docs/v1.0.0-alpha.1"]]);
        let registry = registry(source);

        let result = registry.update().await;

        assert!(matches!(result, Err(RegistryError::NoRelease)));
    }

    #[tokio::test]
    async fn has_reports_known_versions_after_update() {
        let source = source_with_tags(vec![vec![
            "refs/tags/docs/v1.0.0",
            "refs/tags/docs/v1.1.0-rc.1",
        ]]);
        let registry = registry(source);
        registry.update().await.unwrap();

        assert!(registry.has(&v("1.0.0")).await.unwrap());
        assert!(registry.has(&v("1.1.0-rc.1")).await.unwrap());
        assert!(!registry.has(&v("9.9.9")).await.unwrap());
    }

    #[tokio::test]
    async fn latest_heals_missing_snapshot_from_upstream() {
        let mut source = MockReleaseSource::new();
        source
            .expect_list_tags()
            .times(1)
            .returning(|_| Ok(Page::last(vec!["refs/tags/docs/v3.1.4".to_string()])));
        let registry = registry(source);

        assert_eq!(registry.latest().await.unwrap(), v("3.1.4"));
        // the second read is served from the store
        assert_eq!(registry.latest().await.unwrap(), v("3.1.4"));
    }

    #[tokio::test]
    async fn latest_gives_up_after_max_attempts_when_store_never_retains() {
        let mut source = MockReleaseSource::new();
        source
            .expect_list_tags()
            .times(3)
            .returning(|_| Ok(Page::last(vec!["refs/tags/docs/v1.0.0".to_string()])));
        let mut store = MockKvStore::new();
        store.expect_get().times(3).returning(|_| Ok(None));
        store.expect_put().returning(|_, _, _| Ok(()));

        let registry =
            ReleaseRegistry::new(Arc::new(source), Arc::new(store)).with_max_attempts(3);

        let result = registry.latest().await;

        assert!(matches!(
            result,
            Err(RegistryError::Exhausted {
                key: LATEST_KEY,
                attempts: 3
            })
        ));
    }

    #[tokio::test]
    async fn all_propagates_upstream_failure() {
        let mut source = MockReleaseSource::new();
        source.expect_list_tags().times(1).returning(|_| {
            Err(UpstreamError::InvalidResponse("boom".to_string()))
        });
        let registry = registry(source);

        let result = registry.all().await;

        assert!(matches!(result, Err(RegistryError::Upstream(_))));
    }

    #[tokio::test]
    async fn unreadable_stored_value_triggers_refresh() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store
            .put(LATEST_KEY, "not a version", Duration::from_secs(60))
            .await
            .unwrap();
        let mut source = MockReleaseSource::new();
        source
            .expect_list_tags()
            .times(1)
            .returning(|_| Ok(Page::last(vec!["refs/tags/docs/v0.9.0".to_string()])));

        let registry = ReleaseRegistry::new(Arc::new(source), store);

        assert_eq!(registry.latest().await.unwrap(), v("0.9.0"));
    }
}
