use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

// =============================================================================
// Time-related constants
// =============================================================================

pub const ONE_MINUTE: Duration = Duration::from_secs(60);
pub const ONE_HOUR: Duration = Duration::from_secs(60 * 60);
pub const ONE_YEAR: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Lifetime of the persisted release snapshot (latest pointer and sorted list)
pub const RELEASE_SNAPSHOT_TTL: Duration = ONE_HOUR;

/// Upper bound of read/refresh rounds before the registry gives up
pub const MAX_REGISTRY_ATTEMPTS: usize = 25;

/// Cache lifetime of the versions.json listing (5 minutes)
pub const VERSIONS_LISTING_TTL: Duration = Duration::from_secs(5 * 60);

/// Artifacts fetched at the same time while warming the cache
pub const WARM_CONCURRENCY: usize = 8;

/// Connect timeout for upstream requests (30 seconds)
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default base URL for the GitHub REST API
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Default base URL for raw repository content
pub const DEFAULT_RAW_BASE_URL: &str = "https://raw.githubusercontent.com";

/// Default listen address of the HTTP server
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8787";

/// Site configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteConfig {
    pub upstream: UpstreamConfig,
    pub server: ServerConfig,
    pub warm: WarmConfig,
}

/// Where the documentation artifacts and release tags live
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UpstreamConfig {
    pub organization: String,
    pub repository: String,
    pub access_user: String,
    pub access_token: String,
    pub api_base_url: String,
    pub raw_base_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            organization: String::new(),
            repository: String::new(),
            access_user: String::new(),
            access_token: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            raw_base_url: DEFAULT_RAW_BASE_URL.to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub listen: String,
    /// Path of the SQLite database; defaults to [`db_path`]
    pub database: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            database: None,
        }
    }
}

/// Cache warm-up configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WarmConfig {
    /// Interval in seconds between warm-ups while serving; disabled when unset
    pub interval_secs: Option<u64>,
}

impl SiteConfig {
    /// Loads the configuration from an optional JSON file and applies
    /// environment overrides on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                serde_json::from_str(&raw)?
            }
            None => SiteConfig::default(),
        };

        let config = config.with_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Overrides upstream settings from `GITHUB_*` variables
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let upstream = &mut self.upstream;
        for (key, target) in [
            ("GITHUB_ACCESS_USER", &mut upstream.access_user),
            ("GITHUB_ACCESS_TOKEN", &mut upstream.access_token),
            ("GITHUB_ORGANIZATION", &mut upstream.organization),
            ("GITHUB_REPOSITORY", &mut upstream.repository),
        ] {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *target = value;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.organization.is_empty() {
            return Err(ConfigError::Missing("upstream.organization"));
        }
        if self.upstream.repository.is_empty() {
            return Err(ConfigError::Missing("upstream.repository"));
        }
        Ok(())
    }

    pub fn warm_interval(&self) -> Option<Duration> {
        self.warm
            .interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Returns the path to the data directory for docs-edge.
/// Uses $XDG_DATA_HOME/docs-edge if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/docs-edge,
/// or ./docs-edge if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the database file.
pub fn db_path() -> PathBuf {
    data_dir().join("edge.db")
}

/// Returns the directory log files are written to.
pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("docs-edge")
}
