//! Redis-backed cache store.
//!
//! The connection is opened on first use so the service can boot, and keep
//! serving from the database, while Redis is down.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tokio::sync::OnceCell;
use tokio::time::timeout;

use crate::cache::{CacheError, CacheStore, MAX_ENTRY_TTL};

const SCAN_BATCH: usize = 100;

pub struct RedisStore {
    client: Client,
    connection: OnceCell<ConnectionManager>,
    operation_timeout: Duration,
}

impl RedisStore {
    /// Validate the URL without connecting.
    pub fn new(url: &str, operation_timeout: Duration) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(CacheError::unavailable)?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
            operation_timeout,
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                self.bounded(ConnectionManager::new(self.client.clone()))
                    .await
            })
            .await?;
        Ok(manager.clone())
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match timeout(self.operation_timeout, operation).await {
            Ok(result) => result.map_err(CacheError::unavailable),
            Err(_) => Err(CacheError::Timeout(self.operation_timeout)),
        }
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        self.bounded(conn.get::<_, Option<String>>(key)).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let seconds = ttl.min(MAX_ENTRY_TTL).as_secs().max(1);
        self.bounded(conn.set_ex::<_, _, ()>(key, value, seconds))
            .await
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        self.bounded(conn.del::<_, u64>(keys)).await
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut found = Vec::new();

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = self
                .bounded(
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut conn),
                )
                .await?;

            found.extend(keys);
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        found.sort_unstable();
        found.dedup();
        Ok(found)
    }
}
