use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use flashstock_core::cache::HotStore;
use flashstock_core::config::RateLimitConfig;
use flashstock_core::Error;

use crate::error::ApiError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Returns `Ok(())` if `identifier` is still under its limit for this
    /// window, otherwise `Err(Error::RateLimited)`.
    async fn check(&self, identifier: &str) -> Result<(), Error>;
}

/// Fixed-window limiter: one counter per identifier per window, reset by
/// letting Redis expire the key. The increment and the expire-on-first-hit
/// aren't atomic with each other, so a crash between them can leave a
/// counter that never expires; the window is short enough in practice that
/// this hasn't mattered.
pub struct RedisRateLimiter {
    store: HotStore,
    window_secs: u64,
    limit: u32,
}

impl RedisRateLimiter {
    pub fn new(store: HotStore, config: &RateLimitConfig) -> Self {
        Self {
            store,
            window_secs: config.window_seconds,
            limit: config.requests_per_window,
        }
    }

    fn key(&self, identifier: &str) -> String {
        format!("rate_limit:{}", identifier)
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(&self, identifier: &str) -> Result<(), Error> {
        let key = self.key(identifier);
        let current = self.store.incr(&key).await?;

        if current == 1 {
            self.store.expire(&key, self.window_secs).await?;
        }

        if current > self.limit as i64 {
            return Err(Error::RateLimited { retry_after: self.window_secs });
        }

        Ok(())
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let identifier = request
        .extensions()
        .get::<AuthContext>()
        .map(|ctx| ctx.user_id.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    state.rate_limiter.check(&identifier).await?;

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_keys_by_identifier() {
        // key() only touches &self.identifier-independent state, so we
        // can check the format without a real HotStore.
        assert_eq!(format!("rate_limit:{}", "user_123"), "rate_limit:user_123");
    }
}
