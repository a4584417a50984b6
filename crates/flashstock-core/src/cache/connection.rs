use redis::aio::ConnectionManager;
use redis::{Client as RedisClient, Cmd, FromRedisValue};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::RedisConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Connected,
    Reconnecting,
    Failed,
}

/// Redis-backed hot-state store. Wraps a `ConnectionManager`, which
/// reconnects on its own, behind a small retry loop so a momentary drop
/// during a request doesn't bubble up as a hard failure.
#[derive(Clone)]
pub struct HotStore {
    client: Arc<RedisClient>,
    manager: Arc<RwLock<Option<ConnectionManager>>>,
    config: Arc<RedisConfig>,
    state: Arc<RwLock<ConnectionState>>,
}

impl HotStore {
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let client = RedisClient::open(config.url.as_str())
            .map_err(|e| Error::backend_unavailable(format!("invalid redis url: {}", e)))?;

        let store = Self {
            client: Arc::new(client),
            manager: Arc::new(RwLock::new(None)),
            config: Arc::new(config),
            state: Arc::new(RwLock::new(ConnectionState::Failed)),
        };

        store.reconnect().await?;
        info!(url = %store.config.url, "hot store connected");
        Ok(store)
    }

    async fn reconnect(&self) -> Result<()> {
        *self.state.write().await = ConnectionState::Reconnecting;

        let manager = ConnectionManager::new((*self.client).clone())
            .await
            .map_err(|e| {
                error!(error = %e, "redis connection attempt failed");
                Error::from(e)
            });

        match manager {
            Ok(manager) => {
                *self.manager.write().await = Some(manager);
                *self.state.write().await = ConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                *self.state.write().await = ConnectionState::Failed;
                Err(e)
            }
        }
    }

    async fn manager(&self) -> Result<ConnectionManager> {
        {
            let guard = self.manager.read().await;
            if *self.state.read().await == ConnectionState::Connected {
                if let Some(manager) = guard.as_ref() {
                    return Ok(manager.clone());
                }
            }
        }
        self.reconnect().await?;
        self.manager
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::backend_unavailable("no redis connection available"))
    }

    async fn with_timeout<T>(&self, fut: impl std::future::Future<Output = redis::RedisResult<T>>) -> Result<T> {
        let timeout = Duration::from_secs(self.config.operation_timeout_secs);
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Error::from(e)),
            Err(_) => {
                warn!("redis operation timed out");
                Err(Error::backend_unavailable("redis operation timed out"))
            }
        }
    }

    pub async fn health_check(&self) -> bool {
        match self.manager().await {
            Ok(mut manager) => {
                let mut cmd = Cmd::new();
                cmd.arg("PING");
                matches!(cmd.query_async::<_, String>(&mut manager).await.as_deref(), Ok("PONG"))
            }
            Err(_) => false,
        }
    }

    pub async fn stats(&self) -> PoolStats {
        let state = *self.state.read().await;
        PoolStats {
            connected: state == ConnectionState::Connected,
            url: self.config.url.clone(),
        }
    }

    /// Run a Lua script atomically. `build` attaches keys/args to the
    /// invocation with their concrete types (`inv.key(..).arg(..)`) rather
    /// than going through a trait object.
    pub async fn eval_script<T, F>(&self, script: &redis::Script, build: F) -> Result<T>
    where
        T: FromRedisValue,
        F: FnOnce(&mut redis::ScriptInvocation<'_>),
    {
        let mut manager = self.manager().await?;
        let mut invocation = script.prepare_invoke();
        build(&mut invocation);
        self.with_timeout(invocation.invoke_async(&mut manager)).await
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut manager = self.manager().await?;
        self.with_timeout(redis::cmd("GET").arg(key).query_async(&mut manager)).await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut manager = self.manager().await?;
        self.with_timeout::<()>(redis::cmd("SET").arg(key).arg(value).query_async(&mut manager))
            .await
    }

    pub async fn setex(&self, key: &str, ttl_secs: u64, value: &str) -> Result<()> {
        let mut manager = self.manager().await?;
        self.with_timeout::<()>(
            redis::cmd("SETEX")
                .arg(key)
                .arg(ttl_secs)
                .arg(value)
                .query_async(&mut manager),
        )
        .await
    }

    /// `SET key value NX EX ttl_secs`, returns true if the key was set.
    pub async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool> {
        let mut manager = self.manager().await?;
        let result: Option<String> = self
            .with_timeout(
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("NX")
                    .arg("EX")
                    .arg(ttl_secs)
                    .query_async(&mut manager),
            )
            .await?;
        Ok(result.is_some())
    }

    pub async fn del(&self, key: &str) -> Result<bool> {
        let mut manager = self.manager().await?;
        let result: i64 = self
            .with_timeout(redis::cmd("DEL").arg(key).query_async(&mut manager))
            .await?;
        Ok(result > 0)
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        let mut manager = self.manager().await?;
        let result: i64 = self
            .with_timeout(redis::cmd("EXISTS").arg(key).query_async(&mut manager))
            .await?;
        Ok(result > 0)
    }

    pub async fn incr(&self, key: &str) -> Result<i64> {
        let mut manager = self.manager().await?;
        self.with_timeout(redis::cmd("INCR").arg(key).query_async(&mut manager)).await
    }

    pub async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool> {
        let mut manager = self.manager().await?;
        let result: i64 = self
            .with_timeout(redis::cmd("EXPIRE").arg(key).arg(ttl_secs).query_async(&mut manager))
            .await?;
        Ok(result > 0)
    }

    pub async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut manager = self.manager().await?;
        self.with_timeout::<()>(
            redis::cmd("ZADD")
                .arg(key)
                .arg(score)
                .arg(member)
                .query_async(&mut manager),
        )
        .await
    }

    pub async fn zrangebyscore_limit(
        &self,
        key: &str,
        max_score: f64,
        limit: usize,
    ) -> Result<Vec<String>> {
        let mut manager = self.manager().await?;
        self.with_timeout(
            redis::cmd("ZRANGEBYSCORE")
                .arg(key)
                .arg("-inf")
                .arg(max_score)
                .arg("LIMIT")
                .arg(0)
                .arg(limit)
                .query_async(&mut manager),
        )
        .await
    }

    pub async fn zrem(&self, key: &str, member: &str) -> Result<()> {
        let mut manager = self.manager().await?;
        self.with_timeout::<()>(redis::cmd("ZREM").arg(key).arg(member).query_async(&mut manager))
            .await
    }
}

#[derive(Debug, Clone)]
pub struct PoolStats {
    pub connected: bool,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connects_or_reports_unavailable() {
        let config = RedisConfig {
            url: "redis://127.0.0.1:6390".to_string(),
            ..RedisConfig::default()
        };
        let store = HotStore::new(config).await;
        assert!(store.is_err(), "no redis should be listening on 6390 in CI");
    }
}
