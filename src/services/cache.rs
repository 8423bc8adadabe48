//! Cache service implementation
//!
//! Redis-backed read caching for the group transport view. Cached views are
//! keyed by a per-group version counter that is bumped after every committed
//! transport mutation, so a racing stale fill lands under a superseded key
//! and is never served. The cache is strictly an accelerator: correctness
//! never depends on it, and it can be disabled entirely via settings.

use redis::{AsyncCommands, Client, RedisResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::settings::Settings;
use crate::models::transport::GroupTransportView;
use crate::utils::errors::{Result, SkiAmiError};

/// Redis cache service; all operations are no-ops when caching is disabled
#[derive(Debug, Clone)]
pub struct CacheService {
    client: Option<Client>,
    prefix: String,
    ttl_seconds: u64,
}

impl CacheService {
    /// Create a new CacheService instance. Respects the cache feature flag;
    /// opening the client does not yet connect to the server.
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = if settings.features.cache_enabled {
            Some(Client::open(settings.redis.url.as_str()).map_err(SkiAmiError::Redis)?)
        } else {
            None
        };

        Ok(Self {
            client,
            prefix: settings.redis.prefix.clone(),
            ttl_seconds: settings.redis.ttl_seconds,
        })
    }

    /// A cache service that never caches, for environments without Redis
    pub fn disabled() -> Self {
        Self {
            client: None,
            prefix: String::new(),
            ttl_seconds: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    async fn get_connection(&self) -> Result<Option<redis::aio::Connection>> {
        match &self.client {
            Some(client) => {
                let conn = client
                    .get_async_connection()
                    .await
                    .map_err(SkiAmiError::Redis)?;
                Ok(Some(conn))
            }
            None => Ok(None),
        }
    }

    /// Set a value in Redis with TTL
    pub async fn set<T>(&self, key: &str, value: &T, ttl_seconds: Option<u64>) -> Result<()>
    where
        T: Serialize,
    {
        let mut conn = match self.get_connection().await? {
            Some(conn) => conn,
            None => return Ok(()),
        };

        let serialized = serde_json::to_string(value).map_err(SkiAmiError::Serialization)?;
        let full_key = format!("{}{}", self.prefix, key);
        let ttl = ttl_seconds.unwrap_or(self.ttl_seconds);

        let _: () = conn
            .set_ex(&full_key, serialized, ttl)
            .await
            .map_err(SkiAmiError::Redis)?;

        debug!(key = %full_key, ttl = ttl, "Value set in cache");
        Ok(())
    }

    /// Get a value from Redis
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut conn = match self.get_connection().await? {
            Some(conn) => conn,
            None => return Ok(None),
        };

        let full_key = format!("{}{}", self.prefix, key);
        let result: Option<String> = conn.get(&full_key).await.map_err(SkiAmiError::Redis)?;

        match result {
            Some(data) => {
                let deserialized =
                    serde_json::from_str::<T>(&data).map_err(SkiAmiError::Serialization)?;
                debug!(key = %full_key, "Cache hit");
                Ok(Some(deserialized))
            }
            None => {
                debug!(key = %full_key, "Cache miss");
                Ok(None)
            }
        }
    }

    /// Increment a counter, returning the new value
    pub async fn increment(&self, key: &str) -> Result<i64> {
        let mut conn = match self.get_connection().await? {
            Some(conn) => conn,
            None => return Ok(0),
        };

        let full_key = format!("{}{}", self.prefix, key);
        let value: i64 = conn.incr(&full_key, 1).await.map_err(SkiAmiError::Redis)?;

        debug!(key = %full_key, value = value, "Counter incremented");
        Ok(value)
    }

    /// Get a counter value, defaulting to zero
    pub async fn get_counter(&self, key: &str) -> Result<i64> {
        let mut conn = match self.get_connection().await? {
            Some(conn) => conn,
            None => return Ok(0),
        };

        let full_key = format!("{}{}", self.prefix, key);
        let value: Option<i64> = conn.get(&full_key).await.map_err(SkiAmiError::Redis)?;

        Ok(value.unwrap_or(0))
    }

    /// Current cache version of a group's transport view
    pub async fn transport_view_version(&self, group_id: Uuid) -> Result<i64> {
        self.get_counter(&format!("transport:{}:version", group_id))
            .await
    }

    /// Invalidate a group's cached transport view by bumping its version.
    /// Called after a transport mutation commits.
    pub async fn bump_transport_version(&self, group_id: Uuid) -> Result<i64> {
        self.increment(&format!("transport:{}:version", group_id))
            .await
    }

    /// Fetch the cached transport view for a specific version
    pub async fn get_transport_view(
        &self,
        group_id: Uuid,
        version: i64,
    ) -> Result<Option<GroupTransportView>> {
        self.get(&format!("transport:{}:view:{}", group_id, version))
            .await
    }

    /// Store the transport view under its version key
    pub async fn put_transport_view(
        &self,
        group_id: Uuid,
        version: i64,
        view: &GroupTransportView,
    ) -> Result<()> {
        self.set(
            &format!("transport:{}:view:{}", group_id, version),
            view,
            None,
        )
        .await
    }

    /// Health check for the Redis connection. A disabled cache is healthy.
    pub async fn health_check(&self) -> Result<bool> {
        let client = match &self.client {
            Some(client) => client,
            None => return Ok(true),
        };

        match client.get_async_connection().await {
            Ok(mut conn) => {
                let result: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
                match result {
                    Ok(response) => {
                        debug!(response = %response, "Redis health check successful");
                        Ok(response == "PONG")
                    }
                    Err(e) => {
                        warn!(error = %e, "Redis health check failed");
                        Ok(false)
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Redis connection failed");
                Ok(false)
            }
        }
    }
}
