use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::store::{CachedArtifact, KvStore, ResponseCache};

/// Schema migrations
/// Each version contains a list of SQL statements to execute
const MIGRATIONS: &[&[&str]] = &[
    // v1: speeds up purging of expired responses
    &["CREATE INDEX IF NOT EXISTS idx_responses_expires_at ON responses(expires_at)"],
];

/// SQLite backed [`KvStore`] and [`ResponseCache`]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(db_path: &Path) -> Result<Self, StoreError> {
        info!("Initializing store database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::initialize(conn)
    }

    /// Store that lives only as long as the process
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(conn),
        };

        store.create_schema()?;
        let purged = store.purge_expired()?;
        debug!("Purged {} expired entries", purged);

        Ok(store)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Get current timestamp in milliseconds since UNIX epoch
    fn current_timestamp_ms() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }

    fn expires_at(ttl: Duration) -> i64 {
        Self::current_timestamp_ms().saturating_add(ttl.as_millis() as i64)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS responses (
                key TEXT PRIMARY KEY,
                status INTEGER NOT NULL,
                headers TEXT NOT NULL,
                body BLOB NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        Self::apply_migrations(&conn)?;

        debug!("Database schema created successfully");
        Ok(())
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), StoreError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    conn.execute(sql, [])?;
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
            debug!("Updated schema version to v{}", target_version);
        }

        Ok(())
    }

    /// Deletes expired rows from both tables, returning how many were removed
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = Self::current_timestamp_ms();
        let conn = self.lock_conn()?;
        let kv = conn.execute("DELETE FROM kv WHERE expires_at <= ?1", [now])?;
        let responses = conn.execute("DELETE FROM responses WHERE expires_at <= ?1", [now])?;
        Ok(kv + responses)
    }

    fn encode_headers(key: &str, headers: &HeaderMap) -> String {
        let pairs: Vec<(&str, &str)> = headers
            .iter()
            .filter_map(|(name, value)| match value.to_str() {
                Ok(value) => Some((name.as_str(), value)),
                Err(_) => {
                    warn!("Dropping non-UTF-8 header {} of {}", name, key);
                    None
                }
            })
            .collect();
        serde_json::to_string(&pairs).unwrap_or_else(|_| "[]".to_string())
    }

    fn decode_headers(key: &str, raw: &str) -> Result<HeaderMap, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt {
            key: key.to_string(),
            reason,
        };

        let pairs: Vec<(String, String)> =
            serde_json::from_str(raw).map_err(|e| corrupt(e.to_string()))?;

        let mut headers = HeaderMap::with_capacity(pairs.len());
        for (name, value) in pairs {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| corrupt(e.to_string()))?;
            let value = HeaderValue::from_str(&value).map_err(|e| corrupt(e.to_string()))?;
            headers.append(name, value);
        }
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl KvStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Self::current_timestamp_ms();
        let conn = self.lock_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1 AND expires_at > ?2",
                (key, now),
                |row| row.get(0),
            )
            .optional()?;

        Ok(value)
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = Self::expires_at(ttl);
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
            "#,
            (key, value, expires_at),
        )?;

        debug!("Stored {} (ttl {:?})", key, ttl);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ResponseCache for SqliteStore {
    async fn lookup(&self, key: &str) -> Result<Option<CachedArtifact>, StoreError> {
        let now = Self::current_timestamp_ms();
        let row: Option<(u16, String, Vec<u8>)> = {
            let conn = self.lock_conn()?;
            conn.query_row(
                "SELECT status, headers, body FROM responses WHERE key = ?1 AND expires_at > ?2",
                (key, now),
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?
        };

        let Some((status, headers, body)) = row else {
            return Ok(None);
        };

        let status = StatusCode::from_u16(status).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        let headers = Self::decode_headers(key, &headers)?;

        Ok(Some(CachedArtifact {
            key: key.to_string(),
            status,
            headers,
            body,
        }))
    }

    async fn store(&self, artifact: CachedArtifact, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = Self::expires_at(ttl);
        let headers = Self::encode_headers(&artifact.key, &artifact.headers);

        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO responses (key, status, headers, body, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(key) DO UPDATE SET
                status = excluded.status,
                headers = excluded.headers,
                body = excluded.body,
                expires_at = excluded.expires_at
            "#,
            (
                &artifact.key,
                artifact.status.as_u16(),
                headers,
                &artifact.body,
                expires_at,
            ),
        )?;

        debug!(
            "Stored {} ({} bytes, ttl {:?})",
            artifact.key,
            artifact.body.len(),
            ttl
        );
        Ok(())
    }
}
