//! Cache store selection for the running service.

use std::sync::Arc;

use tracing::info;

use crate::cache::{Cache, CacheBackend, CacheConfig, CacheStore, MemoryStore};

use super::error::InfraError;
use super::redis::RedisStore;

/// Build the read cache described by `config`. A disabled cache always
/// misses; a Redis cache connects lazily, so an unreachable server does not
/// stop startup.
pub fn build_cache(config: &CacheConfig) -> Result<Cache, InfraError> {
    if !config.enabled {
        info!(target = "scrivo::cache", "read cache disabled");
        return Ok(Cache::disabled());
    }

    let store: Arc<dyn CacheStore> = match config.backend {
        CacheBackend::Memory => Arc::new(MemoryStore::new(config.memory_capacity)),
        CacheBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| InfraError::configuration("cache.redis_url is not configured"))?;
            let store = RedisStore::new(url, config.operation_timeout)
                .map_err(|err| InfraError::cache(err.to_string()))?;
            Arc::new(store)
        }
    };

    info!(
        target = "scrivo::cache",
        backend = config.backend.as_str(),
        "read cache enabled"
    );
    Ok(Cache::new(store))
}
