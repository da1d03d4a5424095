use crate::config::Config;
use crate::error::{identity_cache_error, AppResult};
use redis::{aio::MultiplexedConnection, AsyncCommands, Client as RedisClient};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::info;

/// Redis key constants
pub mod keys {
    /// Prefix namespacing every name→identifier mapping, so bookkeeping
    /// keys can never collide with a user-chosen event name
    pub const EVENT_NAME_PREFIX: &str = "event_name:";
    pub const GOOGLE_CALENDAR_TOKEN: &str = "google_calendar_token";
}

/// The identity cache actor that processes messages
pub struct IdentityCacheActor {
    config: Arc<RwLock<Config>>,
    command_rx: mpsc::Receiver<IdentityCacheCommand>,
}

/// Commands that can be sent to the identity cache actor
pub enum IdentityCacheCommand {
    Exists(String, mpsc::Sender<AppResult<bool>>),
    Get(String, mpsc::Sender<AppResult<Option<String>>>),
    Register(String, String, mpsc::Sender<AppResult<bool>>),
    Remove(String, mpsc::Sender<AppResult<()>>),
    GetToken(mpsc::Sender<AppResult<Option<Value>>>),
    SaveToken(Value, mpsc::Sender<AppResult<()>>),
    Shutdown,
}

/// Handle for communicating with the identity cache actor
#[derive(Clone)]
pub struct IdentityCacheHandle {
    command_tx: mpsc::Sender<IdentityCacheCommand>,
}

impl IdentityCacheHandle {
    /// Create a new empty handle for initialization purposes
    pub fn empty() -> Self {
        let (command_tx, _) = mpsc::channel(32);
        Self { command_tx }
    }

    /// Check whether a mapping exists for the given event name
    pub async fn exists(&self, name: &str) -> AppResult<bool> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(IdentityCacheCommand::Exists(name.to_string(), response_tx))
            .await
            .map_err(|e| identity_cache_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| identity_cache_error("Response channel closed"))?
    }

    /// Look up the event identifier mapped to the given name
    pub async fn get(&self, name: &str) -> AppResult<Option<String>> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(IdentityCacheCommand::Get(name.to_string(), response_tx))
            .await
            .map_err(|e| identity_cache_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| identity_cache_error("Response channel closed"))?
    }

    /// Register a name→identifier mapping if the name is still free.
    /// Returns false when another registration got there first.
    pub async fn register(&self, name: &str, event_id: &str) -> AppResult<bool> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(IdentityCacheCommand::Register(
                name.to_string(),
                event_id.to_string(),
                response_tx,
            ))
            .await
            .map_err(|e| identity_cache_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| identity_cache_error("Response channel closed"))?
    }

    /// Remove the mapping for the given event name
    pub async fn remove(&self, name: &str) -> AppResult<()> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(IdentityCacheCommand::Remove(name.to_string(), response_tx))
            .await
            .map_err(|e| identity_cache_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| identity_cache_error("Response channel closed"))?
    }

    /// Get the Google OAuth token from Redis
    pub async fn get_token(&self) -> AppResult<Option<Value>> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(IdentityCacheCommand::GetToken(response_tx))
            .await
            .map_err(|e| identity_cache_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| identity_cache_error("Response channel closed"))?
    }

    /// Save the Google OAuth token to Redis
    pub async fn save_token(&self, token: Value) -> AppResult<()> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(IdentityCacheCommand::SaveToken(token, response_tx))
            .await
            .map_err(|e| identity_cache_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| identity_cache_error("Response channel closed"))?
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> AppResult<()> {
        let _ = self
            .command_tx
            .send(IdentityCacheCommand::Shutdown)
            .await;
        Ok(())
    }
}

impl IdentityCacheActor {
    /// Create a new actor and return its handle
    pub fn new(config: Arc<RwLock<Config>>) -> (Self, IdentityCacheHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);

        let actor = Self { config, command_rx };
        let handle = IdentityCacheHandle { command_tx };

        (actor, handle)
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Identity cache actor started");

        // Process commands
        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                IdentityCacheCommand::Exists(name, response_tx) => {
                    let result = self.exists_in_redis(&name).await;
                    let _ = response_tx.send(result).await;
                }
                IdentityCacheCommand::Get(name, response_tx) => {
                    let result = self.get_from_redis(&name).await;
                    let _ = response_tx.send(result).await;
                }
                IdentityCacheCommand::Register(name, event_id, response_tx) => {
                    let result = self.register_in_redis(&name, &event_id).await;
                    let _ = response_tx.send(result).await;
                }
                IdentityCacheCommand::Remove(name, response_tx) => {
                    let result = self.remove_from_redis(&name).await;
                    let _ = response_tx.send(result).await;
                }
                IdentityCacheCommand::GetToken(response_tx) => {
                    let result = self.get_token_from_redis().await;
                    let _ = response_tx.send(result).await;
                }
                IdentityCacheCommand::SaveToken(token, response_tx) => {
                    let result = self.save_token_to_redis(token).await;
                    let _ = response_tx.send(result).await;
                }
                IdentityCacheCommand::Shutdown => {
                    info!("Identity cache actor shutting down");
                    break;
                }
            }
        }

        info!("Identity cache actor shut down");
    }

    /// Get a redis connection
    async fn get_redis_connection(&self) -> AppResult<MultiplexedConnection> {
        // Get Redis URL from config
        let redis_url = {
            let config_guard = self.config.read().await;
            config_guard.redis_url.clone()
        };

        let redis = RedisClient::open(redis_url)
            .map_err(|e| identity_cache_error(&format!("Failed to create Redis client: {}", e)))?;

        redis
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| identity_cache_error(&format!("Failed to connect to Redis: {}", e)))
    }

    /// Compose the namespaced key for a name→identifier mapping
    fn mapping_key(name: &str) -> String {
        format!("{}{}", keys::EVENT_NAME_PREFIX, name)
    }

    /// Check whether a mapping key exists in Redis
    async fn exists_in_redis(&self, name: &str) -> AppResult<bool> {
        let mut redis_conn = self.get_redis_connection().await?;

        let exists: bool = redis_conn
            .exists(Self::mapping_key(name))
            .await
            .map_err(|e| identity_cache_error(&format!("Redis error: {}", e)))?;

        Ok(exists)
    }

    /// Read a mapping from Redis
    async fn get_from_redis(&self, name: &str) -> AppResult<Option<String>> {
        let mut redis_conn = self.get_redis_connection().await?;

        let event_id: Option<String> = redis_conn
            .get(Self::mapping_key(name))
            .await
            .map_err(|e| identity_cache_error(&format!("Failed to read mapping from Redis: {}", e)))?;

        Ok(event_id)
    }

    /// Register a mapping in Redis iff the name is unclaimed (SETNX)
    async fn register_in_redis(&self, name: &str, event_id: &str) -> AppResult<bool> {
        let mut redis_conn = self.get_redis_connection().await?;

        let registered: bool = redis_conn
            .set_nx(Self::mapping_key(name), event_id)
            .await
            .map_err(|e| identity_cache_error(&format!("Failed to save mapping to Redis: {}", e)))?;

        Ok(registered)
    }

    /// Remove a mapping from Redis
    async fn remove_from_redis(&self, name: &str) -> AppResult<()> {
        let mut redis_conn = self.get_redis_connection().await?;

        () = redis_conn
            .del(Self::mapping_key(name))
            .await
            .map_err(|e| identity_cache_error(&format!("Failed to remove mapping from Redis: {}", e)))?;

        Ok(())
    }

    /// Get token from Redis
    async fn get_token_from_redis(&self) -> AppResult<Option<Value>> {
        let mut redis_conn = self.get_redis_connection().await?;

        // Check if token exists in Redis
        let exists: bool = redis_conn
            .exists(keys::GOOGLE_CALENDAR_TOKEN)
            .await
            .map_err(|e| identity_cache_error(&format!("Redis error: {}", e)))?;

        if !exists {
            return Ok(None);
        }

        let token_json: String = redis_conn
            .get(keys::GOOGLE_CALENDAR_TOKEN)
            .await
            .map_err(|e| identity_cache_error(&format!("Failed to read token from Redis: {}", e)))?;

        let token: Value = serde_json::from_str(&token_json)
            .map_err(|e| identity_cache_error(&format!("Failed to deserialize token: {}", e)))?;

        Ok(Some(token))
    }

    /// Save token to Redis
    async fn save_token_to_redis(&self, token: Value) -> AppResult<()> {
        let mut redis_conn = self.get_redis_connection().await?;

        () = redis_conn
            .set(keys::GOOGLE_CALENDAR_TOKEN, token.to_string())
            .await
            .map_err(|e| identity_cache_error(&format!("Failed to save token to Redis: {}", e)))?;

        Ok(())
    }
}
