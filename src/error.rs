use std::path::PathBuf;

use http::StatusCode;
use semver::Version;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Missing configuration value: {0}")]
    Missing(&'static str),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to acquire database lock")]
    LockPoisoned,

    #[error("Corrupt entry for {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Failures talking to GitHub (API or raw content)
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Unexpected status {status} from {url}")]
    Status { status: StatusCode, url: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Release tags unavailable: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("There is no release version available upstream")]
    NoRelease,

    #[error("Was not able to retrieve {key} after {attempts} tries")]
    Exhausted { key: &'static str, attempts: usize },
}

#[derive(Debug, Error)]
pub enum WarmError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Release tree of {tag} unavailable: {source}")]
    Crawl { tag: String, source: UpstreamError },
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Unknown version: {0}")]
    UnknownVersion(Version),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Path {0} is not valid")]
    InvalidPath(String),

    /// Upstream answered with an error status while no error page could be substituted
    #[error("Upstream returned {status} for {url}")]
    UpstreamStatus { status: StatusCode, url: String },
}
