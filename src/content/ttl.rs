//! TTL classes of cached artifacts

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::config::{ONE_HOUR, ONE_MINUTE, ONE_YEAR};
use crate::release::DocsTarget;

/// Content-addressed bundles such as `app.a1b2c3d4.min.js`
static UNIQUE_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9]+\.[a-f0-9]{8,32}\.min\.(?:js|css)$").expect("valid regex")
});

/// How long a cached artifact is considered fresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlClass {
    /// Content-addressed file name, never changes
    Unique,
    /// Pull-request preview or prerelease
    Prerelease,
    /// Regular release
    Release,
    /// Substituted error page
    ErrorPage,
}

impl TtlClass {
    /// Classifies an artifact by its file name and the target it belongs to.
    ///
    /// The file name wins over the target: a content-addressed bundle is
    /// immutable even inside a preview.
    pub fn classify(filename: &str, target: &DocsTarget) -> Self {
        if UNIQUE_FILENAME.is_match(filename) {
            TtlClass::Unique
        } else if target.is_volatile() {
            TtlClass::Prerelease
        } else {
            TtlClass::Release
        }
    }

    pub fn duration(self) -> Duration {
        match self {
            TtlClass::Unique => ONE_YEAR,
            TtlClass::Prerelease => ONE_MINUTE * 15,
            TtlClass::Release => ONE_HOUR * 12,
            TtlClass::ErrorPage => ONE_MINUTE * 5,
        }
    }

    /// Value of the `Cache-Control` header for this class
    pub fn cache_control(self) -> String {
        format!("public, max-age={}", self.duration().as_secs())
    }
}

/// Last path segment of a URL path (`/a/b/` -> `b`)
pub fn filename_of(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}
