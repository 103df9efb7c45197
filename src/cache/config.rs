//! Cache configuration.
//!
//! Selects the backing store and holds the expiry applied to each cached
//! projection.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_POST_LIST_TTL_SECS: u64 = 300;
const DEFAULT_POST_DETAIL_TTL_SECS: u64 = 600;
const DEFAULT_TAG_LIST_TTL_SECS: u64 = 3600;
const DEFAULT_COMMENT_LIST_TTL_SECS: u64 = 300;
const DEFAULT_MEMORY_CAPACITY: usize = 10_000;
const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl CacheBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Redis => "redis",
            Self::Memory => "memory",
        }
    }
}

/// Expiry for each cached projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub post_list: Duration,
    pub post_detail: Duration,
    pub tag_list: Duration,
    pub comment_list: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            post_list: Duration::from_secs(DEFAULT_POST_LIST_TTL_SECS),
            post_detail: Duration::from_secs(DEFAULT_POST_DETAIL_TTL_SECS),
            tag_list: Duration::from_secs(DEFAULT_TAG_LIST_TTL_SECS),
            comment_list: Duration::from_secs(DEFAULT_COMMENT_LIST_TTL_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub backend: CacheBackend,
    pub redis_url: Option<String>,
    /// Upper bound on any single round-trip to the cache backend.
    pub operation_timeout: Duration,
    pub memory_capacity: NonZeroUsize,
    pub ttls: CacheTtls,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Memory,
            redis_url: None,
            operation_timeout: Duration::from_millis(DEFAULT_OPERATION_TIMEOUT_MS),
            memory_capacity: NonZeroUsize::new(DEFAULT_MEMORY_CAPACITY)
                .unwrap_or(NonZeroUsize::MIN),
            ttls: CacheTtls::default(),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            backend: settings.backend,
            redis_url: settings.redis_url.clone(),
            operation_timeout: settings.operation_timeout,
            memory_capacity: settings.memory_capacity,
            ttls: settings.ttls,
        }
    }
}
