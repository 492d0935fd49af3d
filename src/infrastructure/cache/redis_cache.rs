//! Redis-backed cache implementation.

use super::service::{CacheError, CacheResult, CacheService};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, error, info, warn};

/// Keys fetched per `SCAN` round during prefix invalidation.
const SCAN_BATCH: usize = 200;

/// Redis cache implementation for listing results.
///
/// Uses `ConnectionManager` for connection reuse. Read, write and counter errors
/// are returned so the caller can fall back to the store; prefix invalidation
/// only logs them.
pub struct RedisCache {
    client: ConnectionManager,
    default_ttl: u64,
}

impl RedisCache {
    /// Connects to Redis, validates the connection with a PING, and configures the default TTL.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str, default_ttl_seconds: u64) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("Connected to Redis");

        Ok(Self {
            client: manager,
            default_ttl: default_ttl_seconds,
        })
    }

    async fn scan_keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.client.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheError::OperationError(e.to_string()))?;

            keys.extend(batch);
            if next == 0 {
                return Ok(keys);
            }
            cursor = next;
        }
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.client.clone();

        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(value)) => {
                debug!("Cache HIT: {}", key);
                Ok(Some(value))
            }
            Ok(None) => {
                debug!("Cache MISS: {}", key);
                Ok(None)
            }
            Err(e) => {
                error!("Redis GET error for {}: {}", key, e);
                Err(CacheError::OperationError(e.to_string()))
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> CacheResult<()> {
        let mut conn = self.client.clone();
        let ttl = ttl_seconds.unwrap_or(self.default_ttl);

        match conn.set_ex::<_, _, ()>(key, value, ttl).await {
            Ok(_) => {
                debug!("Cache SET: {} (TTL: {}s)", key, ttl);
                Ok(())
            }
            Err(e) => {
                warn!("Redis SET error for {}: {}", key, e);
                Err(CacheError::OperationError(e.to_string()))
            }
        }
    }

    async fn invalidate_prefix(&self, prefix: &str) -> CacheResult<()> {
        let keys = match self.scan_keys(&format!("{prefix}*")).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Redis SCAN error for {}*: {}", prefix, e);
                return Ok(());
            }
        };

        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.client.clone();
        match conn.del::<_, i64>(&keys).await {
            Ok(deleted) => {
                debug!("Cache INVALIDATE: {}* ({} keys)", prefix, deleted);
                Ok(())
            }
            Err(e) => {
                warn!("Redis DEL error for {}*: {}", prefix, e);
                Ok(())
            }
        }
    }

    async fn increment(&self, key: &str) -> CacheResult<u64> {
        let mut conn = self.client.clone();

        conn.incr::<_, _, u64>(key, 1).await.map_err(|e| {
            warn!("Redis INCR error for {}: {}", key, e);
            CacheError::OperationError(e.to_string())
        })
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}
