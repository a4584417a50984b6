use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use flashstock_core::Error;
use serde_json::json;

/// Newtype so this crate can provide the one shared `IntoResponse` impl for
/// `flashstock_core::Error` that every route handler relies on, instead of
/// hand-building a status code per route.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = match &self.0 {
            Error::Insufficient { available } => json!({ "error": "INSUFFICIENT", "available": available }),
            Error::RateLimited { retry_after } => {
                json!({ "error": "RATE_LIMITED", "retry_after": retry_after })
            }
            _ => json!({ "error": self.0.category().to_uppercase(), "message": self.0.to_string() }),
        };

        if !matches!(self.0, Error::Database(_) | Error::Cache(_) | Error::Serialization(_) | Error::Config(_)) {
            tracing::debug!(status = status.as_u16(), error = %self.0, "request failed");
        } else {
            tracing::error!(status = status.as_u16(), error = %self.0, "request failed");
        }

        (status, Json(body)).into_response()
    }
}
