//! Read-through cache: key policy, fail-open facade, invalidation and stores.

mod config;
pub mod invalidation;
pub mod keys;
mod layer;
mod lock;
pub mod store;

pub use config::{CacheBackend, CacheConfig, CacheTtls};
pub use invalidation::{Invalidator, Mutation, Purge, purge_plan};
pub use layer::{
    Cache, CachedValue, METRIC_CACHE_ERROR, METRIC_CACHE_HIT, METRIC_CACHE_INVALIDATED,
    METRIC_CACHE_MISS,
};
pub use store::{CacheError, CacheStore, MAX_ENTRY_TTL, MemoryStore, NullStore};
