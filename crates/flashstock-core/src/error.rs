use std::fmt;

/// Main error type for the reservation core.
///
/// Every variant corresponds to one of the error kinds in the component
/// design: each carries exactly the context its HTTP mapping needs, and
/// none of them is raised as a panic or exception across a component
/// boundary — callers always get this back as a `Result`.
#[derive(Debug)]
pub enum Error {
    /// `available < requested` on `reserve`.
    Insufficient { available: i64 },

    /// Counter key absent for the SKU.
    NotInitialized,

    /// Reservation record absent: expired, already consumed, or never existed.
    NotFound,

    /// `user_id` mismatch on confirm/cancel.
    Forbidden,

    /// Race between confirm/cancel/expire; internal, maps to 404 when surfaced.
    AlreadyTerminal,

    /// Schema/range violation.
    InvalidInput(String),

    /// External rate-limit gate denied the request.
    RateLimited { retry_after: u64 },

    /// Missing or invalid bearer token.
    Unauthenticated,

    /// Hot or durable store unreachable after retries/timeout.
    BackendUnavailable(String),

    /// Configuration errors.
    Config(String),

    /// Database errors (sqlx wrapped).
    Database(sqlx::Error),

    /// Redis errors.
    Cache(redis::RedisError),

    /// Serialization errors.
    Serialization(serde_json::Error),

    /// Generic errors with description.
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Insufficient { available } => {
                write!(f, "insufficient stock: available={}", available)
            }
            Error::NotInitialized => write!(f, "SKU not initialized"),
            Error::NotFound => write!(f, "reservation not found"),
            Error::Forbidden => write!(f, "not the reservation owner"),
            Error::AlreadyTerminal => write!(f, "reservation already terminal"),
            Error::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            Error::RateLimited { retry_after } => {
                write!(f, "rate limited, retry after {}s", retry_after)
            }
            Error::Unauthenticated => write!(f, "missing or invalid credentials"),
            Error::BackendUnavailable(msg) => write!(f, "backend unavailable: {}", msg),
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
            Error::Database(e) => write!(f, "database error: {}", e),
            Error::Cache(e) => write!(f, "cache error: {}", e),
            Error::Serialization(e) => write!(f, "serialization error: {}", e),
            Error::Other(msg) => write!(f, "error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(e) => Some(e),
            Error::Cache(e) => Some(e),
            Error::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Database(e)
    }
}

impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::Cache(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e)
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Error::BackendUnavailable("operation timed out".to_string())
    }
}

impl Error {
    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Error::Config(msg.into())
    }

    pub fn backend_unavailable<T: Into<String>>(msg: T) -> Self {
        Error::BackendUnavailable(msg.into())
    }

    /// HTTP status code for this error, per the error-kind surface mapping.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Insufficient { .. } => 409,
            Error::NotInitialized => 409,
            Error::NotFound => 404,
            Error::Forbidden => 403,
            Error::AlreadyTerminal => 404,
            Error::InvalidInput(_) => 400,
            Error::RateLimited { .. } => 429,
            Error::Unauthenticated => 401,
            Error::BackendUnavailable(_) => 503,
            Error::Config(_) => 500,
            Error::Database(_) => 503,
            Error::Cache(_) => 503,
            Error::Serialization(_) => 500,
            Error::Other(_) => 500,
        }
    }

    /// Category label for logging/metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Insufficient { .. } => "insufficient",
            Error::NotInitialized => "not_initialized",
            Error::NotFound => "not_found",
            Error::Forbidden => "forbidden",
            Error::AlreadyTerminal => "already_terminal",
            Error::InvalidInput(_) => "invalid_input",
            Error::RateLimited { .. } => "rate_limited",
            Error::Unauthenticated => "unauthenticated",
            Error::BackendUnavailable(_) => "backend_unavailable",
            Error::Config(_) => "config",
            Error::Database(_) => "database",
            Error::Cache(_) => "cache",
            Error::Serialization(_) => "serialization",
            Error::Other(_) => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_surface_table() {
        assert_eq!(Error::Insufficient { available: 0 }.status_code(), 409);
        assert_eq!(Error::NotInitialized.status_code(), 409);
        assert_eq!(Error::NotFound.status_code(), 404);
        assert_eq!(Error::Forbidden.status_code(), 403);
        assert_eq!(Error::AlreadyTerminal.status_code(), 404);
        assert_eq!(Error::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(Error::RateLimited { retry_after: 1 }.status_code(), 429);
        assert_eq!(Error::Unauthenticated.status_code(), 401);
        assert_eq!(Error::BackendUnavailable("x".into()).status_code(), 503);
    }
}
