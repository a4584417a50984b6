use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Top-level configuration, loaded from a TOML file and overridable by
/// environment variables prefixed `FLASHSTOCK_`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub reservation: ReservationConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub graceful_shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            graceful_shutdown_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub pool_size: u32,
    pub connect_timeout_secs: u64,
    pub query_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "flashstock".to_string(),
            username: "flashstock".to_string(),
            password: String::new(),
            pool_size: 10,
            connect_timeout_secs: 5,
            query_timeout_secs: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    pub pool_size: u32,
    pub connect_timeout_secs: u64,
    pub operation_timeout_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 10,
            connect_timeout_secs: 5,
            operation_timeout_secs: 2,
        }
    }
}

/// Reservation-engine tuning: TTLs, quantity caps, sweeper cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservationConfig {
    pub ttl_seconds: u64,
    pub max_quantity_per_reservation: i64,
    pub sweeper_interval_seconds: u64,
    pub sweeper_batch_size: usize,
    pub idempotency_ttl_seconds: u64,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
            max_quantity_per_reservation: 5,
            sweeper_interval_seconds: 1,
            sweeper_batch_size: 100,
            idempotency_ttl_seconds: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_window: u32,
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: 20,
            window_seconds: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    pub secret: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: default_jwt_secret(),
        }
    }
}

fn default_jwt_secret() -> String {
    // Replace with a securely generated key before running against real traffic.
    "change_this_in_production_to_a_secure_random_key".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            redis: RedisConfig::default(),
            reservation: ReservationConfig::default(),
            rate_limit: RateLimitConfig::default(),
            logging: LoggingConfig::default(),
            jwt: JwtConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::config(format!("failed to read {}: {}", path.as_ref().display(), e)))?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve configuration the way the binary entrypoint does: look for
    /// `FLASHSTOCK_CONFIG`, then fall back to `config.toml` in the current
    /// directory, then to built-in defaults.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = std::env::var("FLASHSTOCK_CONFIG") {
            return Self::load(path);
        }
        if Path::new("config.toml").exists() {
            return Self::load("config.toml");
        }
        let mut config = Config::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("FLASHSTOCK_REDIS_URL") {
            self.redis.url = url;
        }
        if let Ok(host) = std::env::var("FLASHSTOCK_DB_HOST") {
            self.database.host = host;
        }
        if let Ok(port) = std::env::var("FLASHSTOCK_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::config("server.port must be nonzero"));
        }
        if self.reservation.max_quantity_per_reservation <= 0 {
            return Err(Error::config(
                "reservation.max_quantity_per_reservation must be positive",
            ));
        }
        if self.reservation.ttl_seconds == 0 {
            return Err(Error::config("reservation.ttl_seconds must be positive"));
        }
        if self.reservation.sweeper_batch_size == 0 {
            return Err(Error::config("reservation.sweeper_batch_size must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_nonpositive_max_quantity() {
        let mut config = Config::default();
        config.reservation.max_quantity_per_reservation = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_toml() {
        let toml_str = r#"
            [server]
            port = 9090

            [reservation]
            ttl_seconds = 120
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.reservation.ttl_seconds, 120);
        assert_eq!(config.reservation.max_quantity_per_reservation, 5);
    }
}
