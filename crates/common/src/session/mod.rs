//! Server-side session storage
//!
//! Provides:
//! - A `SessionStore` abstraction over JSON-serializable session state
//! - An in-memory store with TTL expiry (single instance deployments)
//! - A Redis-backed store for shared deployments

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Storage for per-browser session state keyed by session id
#[async_trait]
pub trait SessionStore<T>: Send + Sync
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Load the state for a session, `None` if unknown or expired
    async fn load(&self, id: Uuid) -> Result<Option<T>>;

    /// Save (replace) the state for a session and refresh its TTL
    async fn save(&self, id: Uuid, state: &T) -> Result<()>;

    /// Check that the backend is reachable
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

struct Entry<T> {
    state: T,
    expires_at: Instant,
}

/// In-memory session store
pub struct MemorySessionStore<T> {
    entries: RwLock<HashMap<Uuid, Entry<T>>>,
    ttl: Duration,
}

impl<T> MemorySessionStore<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Remove expired sessions, returning how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let purged = before - entries.len();
        if purged > 0 {
            debug!(purged, "Purged expired sessions");
        }
        purged
    }
}

#[async_trait]
impl<T> SessionStore<T> for MemorySessionStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn load(&self, id: Uuid) -> Result<Option<T>> {
        let entries = self.entries.read().await;
        match entries.get(&id) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.state.clone())),
            Some(_) => {
                debug!(session_id = %id, "Session expired");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn save(&self, id: Uuid, state: &T) -> Result<()> {
        let entry = Entry {
            state: state.clone(),
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.insert(id, entry);
        Ok(())
    }
}

/// Redis-backed session store
pub struct RedisSessionStore<T> {
    connection: RwLock<MultiplexedConnection>,
    key_prefix: String,
    ttl_secs: u64,
    _state: PhantomData<fn() -> T>,
}

impl<T> RedisSessionStore<T> {
    /// Connect to Redis
    pub async fn connect(url: &str, key_prefix: &str, ttl_secs: u64) -> Result<Self> {
        let client = Client::open(url).map_err(|e| AppError::CacheError {
            message: format!("Failed to create Redis client: {}", e),
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to connect to Redis: {}", e),
            })?;

        info!(key_prefix, ttl_secs, "Connected Redis session store");

        Ok(Self {
            connection: RwLock::new(connection),
            key_prefix: key_prefix.to_string(),
            ttl_secs,
            _state: PhantomData,
        })
    }

    fn key(&self, id: Uuid) -> String {
        session_key(&self.key_prefix, id)
    }
}

#[async_trait]
impl<T> SessionStore<T> for RedisSessionStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn load(&self, id: Uuid) -> Result<Option<T>> {
        let key = self.key(id);
        let mut conn = self.connection.write().await;

        let value: Option<String> = conn.get(&key).await.map_err(|e| AppError::CacheError {
            message: format!("Failed to get key '{}': {}", key, e),
        })?;

        match value {
            Some(json) => {
                let state = serde_json::from_str(&json).map_err(|e| AppError::CacheError {
                    message: format!("Failed to parse session state: {}", e),
                })?;
                debug!(key = %key, "Session hit");
                Ok(Some(state))
            }
            None => {
                debug!(key = %key, "Session miss");
                Ok(None)
            }
        }
    }

    async fn save(&self, id: Uuid, state: &T) -> Result<()> {
        let key = self.key(id);
        let json = serde_json::to_string(state)?;

        let mut conn = self.connection.write().await;
        let _: () = conn
            .set_ex(&key, &json, self.ttl_secs)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to set key '{}': {}", key, e),
            })?;

        debug!(key = %key, ttl_secs = self.ttl_secs, "Session saved");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.write().await;
        redis::cmd("PING")
            .query_async::<String>(&mut *conn)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Redis ping failed: {}", e),
            })?;
        Ok(())
    }
}

/// Build the namespaced Redis key for a session
pub fn session_key(prefix: &str, id: Uuid) -> String {
    format!("{}:session:{}", prefix, id)
}
