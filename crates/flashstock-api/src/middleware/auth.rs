use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use flashstock_core::Error;

use crate::error::ApiError;
use crate::state::AppState;

/// Boundary between this API and whatever verifies a bearer token. The
/// reservation engine itself only ever needs a verified `user_id` string;
/// how that string is produced is an external collaborator's concern.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, bearer_token: &str) -> Result<String, Error>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

/// Local/dev default: a JWT whose `sub` claim is the user id.
pub struct JwtIdentityProvider {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify(&self, bearer_token: &str) -> Result<String, Error> {
        let data = decode::<Claims>(bearer_token, &self.decoding_key, &self.validation)
            .map_err(|_| Error::Unauthenticated)?;
        Ok(data.claims.sub)
    }
}

/// The authenticated principal for the current request, inserted into
/// request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
}

pub fn extract_bearer_token(header_value: &str) -> Option<&str> {
    header_value.strip_prefix("Bearer ").map(str::trim)
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or(Error::Unauthenticated)?;

    let user_id = state.identity.verify(token).await?;
    request.extensions_mut().insert(AuthContext { user_id });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }
}
