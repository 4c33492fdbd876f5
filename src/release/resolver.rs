//! Maps a requested version (or none) to a concrete documentation target

use std::sync::Arc;

use tracing::debug;

use crate::error::ResolveError;
use crate::release::registry::ReleaseRegistry;
use crate::release::target::DocsTarget;

/// A concrete target plus whether it is the current latest release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub target: DocsTarget,
    pub is_latest: bool,
}

impl ResolvedTarget {
    pub fn latest(version: semver::Version) -> Self {
        Self {
            target: DocsTarget::Release(version),
            is_latest: true,
        }
    }

    /// Public path of `path` within this target
    ///
    /// The latest release is served from the site root, everything else
    /// below its segment (`/v1.2.3/...`, `/pr-42/...`).
    pub fn public_path(&self, path: &str) -> String {
        if self.is_latest {
            path.to_string()
        } else {
            format!("/{}{}", self.target.segment(), path)
        }
    }
}

pub struct VersionResolver {
    registry: Arc<ReleaseRegistry>,
}

impl VersionResolver {
    pub fn new(registry: Arc<ReleaseRegistry>) -> Self {
        Self { registry }
    }

    /// Resolves a request for `requested`, or for latest when None.
    ///
    /// Releases must be known to the registry; pull requests are not tracked
    /// there and are accepted as-is.
    pub async fn resolve(
        &self,
        requested: Option<&DocsTarget>,
    ) -> Result<ResolvedTarget, ResolveError> {
        match requested {
            None => {
                let latest = self.registry.latest().await?;
                Ok(ResolvedTarget::latest(latest))
            }
            Some(DocsTarget::PullRequest(number)) => Ok(ResolvedTarget {
                target: DocsTarget::PullRequest(*number),
                is_latest: false,
            }),
            Some(DocsTarget::Release(version)) => {
                if !self.registry.has(version).await? {
                    debug!("Requested unknown version {}", version);
                    return Err(ResolveError::UnknownVersion(version.clone()));
                }
                let latest = self.registry.latest().await?;
                Ok(ResolvedTarget {
                    target: DocsTarget::Release(version.clone()),
                    is_latest: latest.to_string() == version.to_string(),
                })
            }
        }
    }
}
