//! Cache Layer — versioned key/value memoization for enrichment fingerprints
//! (spec §4.3).

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::SqlitePool;

/// TTL for enrichment results (spec §4.3).
pub const ENRICHMENT_TTL_DAYS: i64 = 90;
/// TTL for suppression replicas (spec §4.3).
pub const SUPPRESSION_TTL_HOURS: i64 = 24;

/// A cache lookup result; never returns data past its TTL (spec §4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup<T> {
    Hit(T),
    Miss,
}

type CacheRow = (String, DateTime<Utc>);

/// The Cache Layer (spec §4.3). Keys are namespaced by a version prefix
/// (e.g. `"v1:enrichment:..."`); bumping the prefix invalidates every entry
/// without a delete pass.
#[derive(Clone)]
pub struct CacheLayer {
    db: SqlitePool,
    version_prefix: String,
}

impl CacheLayer {
    pub fn new(db: SqlitePool, version_prefix: String) -> Self {
        Self { db, version_prefix }
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.version_prefix, key)
    }

    /// Fetches a cached value, deserializing it as `T`. Returns `Miss` on
    /// cache miss or TTL expiry; never returns stale data (spec §4.3).
    ///
    /// # Errors
    ///
    /// Returns an error if the query or the stored payload's deserialization
    /// fails for a reason other than absence.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<CacheLookup<T>, sqlx::Error> {
        let row: Option<CacheRow> = sqlx::query_as(
            "SELECT payload, expires_at FROM cache_entries WHERE key = ?1",
        )
        .bind(self.namespaced(key))
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some((payload, expires_at)) if expires_at > Utc::now() => {
                match serde_json::from_str(&payload) {
                    Ok(value) => Ok(CacheLookup::Hit(value)),
                    Err(_) => Ok(CacheLookup::Miss),
                }
            }
            _ => Ok(CacheLookup::Miss),
        }
    }

    /// Stores a value under `key` with the given TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn put<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), sqlx::Error> {
        let payload = serde_json::to_string(value)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let expires_at = Utc::now() + ttl;

        sqlx::query(
            "INSERT INTO cache_entries (key, payload, expires_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, expires_at = excluded.expires_at",
        )
        .bind(self.namespaced(key))
        .bind(payload)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
