pub mod auth;
pub mod rate_limit;

pub use auth::{auth_middleware, AuthContext, IdentityProvider, JwtIdentityProvider};
pub use rate_limit::{rate_limit_middleware, RateLimiter, RedisRateLimiter};
