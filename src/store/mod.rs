//! Shared stores the edge reads from and writes to
//!
//! Both stores are treated as eventually consistent: every write is
//! best-effort and every absent read has a fallback upstream.
//!
//! - [`KvStore`]: small string values (the release snapshot)
//! - [`ResponseCache`]: full artifact responses keyed by upstream URL
//! - [`sqlite`]: SQLite implementation of both

pub mod sqlite;

use std::time::Duration;

use http::{HeaderMap, StatusCode};
#[cfg(test)]
use mockall::automock;

use crate::error::StoreError;

pub use sqlite::SqliteStore;

/// A response as stored in the [`ResponseCache`]
///
/// Entries are never mutated. A later store under the same key supersedes them.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedArtifact {
    /// Absolute upstream URL the response was fetched from
    pub key: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Key/value store with per-entry expiration
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait KvStore: Send + Sync {
    /// Returns the value unless it is absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;
}

/// Response cache with per-entry expiration
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ResponseCache: Send + Sync {
    async fn lookup(&self, key: &str) -> Result<Option<CachedArtifact>, StoreError>;

    async fn store(&self, artifact: CachedArtifact, ttl: Duration) -> Result<(), StoreError>;
}
