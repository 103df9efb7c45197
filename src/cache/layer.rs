//! Fail-open cache facade.
//!
//! Every operation swallows backend failures: they are logged, counted and
//! reported to the caller as a miss or a no-op, never as an error.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::store::{CacheError, CacheStore, NullStore};

pub const METRIC_CACHE_HIT: &str = "scrivo_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "scrivo_cache_miss_total";
pub const METRIC_CACHE_ERROR: &str = "scrivo_cache_error_total";
pub const METRIC_CACHE_INVALIDATED: &str = "scrivo_cache_invalidated_keys_total";

/// A decoded cache entry.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    /// The stored text parsed as JSON.
    Json(Value),
    /// The stored text was not JSON and is returned verbatim.
    Raw(String),
}

impl CachedValue {
    fn decode(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Raw(text),
        }
    }

    fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Raw(text) => Value::String(text),
        }
    }
}

#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// A cache that never holds anything.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NullStore))
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Store `value` under `key` for `ttl`. Strings, numbers and booleans
    /// are stored as their plain text; anything else as JSON.
    pub async fn set<T>(&self, key: &str, value: &T, ttl: Duration) -> bool
    where
        T: Serialize + ?Sized,
    {
        let text = match encode(value) {
            Ok(text) => text,
            Err(err) => {
                self.report("set", key, &err);
                return false;
            }
        };

        match self.store.set(key, text, ttl).await {
            Ok(()) => {
                debug!(
                    target = "scrivo::cache",
                    key,
                    ttl_secs = ttl.as_secs(),
                    "cache set"
                );
                true
            }
            Err(err) => {
                self.report("set", key, &err);
                false
            }
        }
    }

    pub async fn get(&self, key: &str) -> Option<CachedValue> {
        match self.store.get(key).await {
            Ok(Some(text)) => {
                counter!(METRIC_CACHE_HIT, "backend" => self.backend()).increment(1);
                debug!(target = "scrivo::cache", key, "cache hit");
                Some(CachedValue::decode(text))
            }
            Ok(None) => {
                counter!(METRIC_CACHE_MISS, "backend" => self.backend()).increment(1);
                debug!(target = "scrivo::cache", key, "cache miss");
                None
            }
            Err(err) => {
                self.report("get", key, &err);
                None
            }
        }
    }

    /// Typed read. An entry that does not decode into `T` counts as a miss.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cached = self.get(key).await?;
        match serde_json::from_value(cached.into_json()) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    target = "scrivo::cache",
                    key,
                    error = %err,
                    "cached entry has unexpected shape; treating as miss"
                );
                None
            }
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        match self.store.delete(&[key.to_string()]).await {
            Ok(removed) => {
                counter!(METRIC_CACHE_INVALIDATED, "backend" => self.backend()).increment(removed);
                true
            }
            Err(err) => {
                self.report("delete", key, &err);
                false
            }
        }
    }

    /// Delete every live key matching a glob pattern in one batch.
    /// Returns the number of keys removed; zero when the backend failed.
    pub async fn delete_by_pattern(&self, pattern: &str) -> u64 {
        let keys = match self.store.scan(pattern).await {
            Ok(keys) => keys,
            Err(err) => {
                self.report("scan", pattern, &err);
                return 0;
            }
        };
        if keys.is_empty() {
            return 0;
        }

        match self.store.delete(&keys).await {
            Ok(removed) => {
                counter!(METRIC_CACHE_INVALIDATED, "backend" => self.backend()).increment(removed);
                debug!(
                    target = "scrivo::cache",
                    pattern,
                    removed,
                    "cache pattern purge"
                );
                removed
            }
            Err(err) => {
                self.report("delete_by_pattern", pattern, &err);
                0
            }
        }
    }

    fn report(&self, op: &'static str, key: &str, err: &CacheError) {
        counter!(METRIC_CACHE_ERROR, "backend" => self.backend(), "op" => op).increment(1);
        warn!(
            target = "scrivo::cache",
            op,
            key,
            backend = self.backend(),
            error = %err,
            "cache operation failed; continuing without cache"
        );
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, CacheError> {
    Ok(match serde_json::to_value(value)? {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => serde_json::to_string(&other)?,
    })
}
