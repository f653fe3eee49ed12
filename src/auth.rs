use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{config::AppConfig, error::ApiError};

/// Lifetime of a token issued by `POST /login`, in seconds.
pub const TOKEN_TTL_SECS: i64 = 60 * 60;

/// Claims
///
/// Payload of the bearer token. Only the username identifies the caller; there
/// are no roles or scopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
    /// Expiration Time (exp). Tokens are rejected once this has passed.
    pub exp: usize,
}

/// AuthUser
///
/// The verified identity of the caller. The auth gate inserts it into the
/// request extensions after the token checks out; it is never present on
/// public routes.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub username: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.username,
        }
    }
}

/// Signs a one-hour token for `username` with the shared secret.
pub fn issue_token(secret: &str, username: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        username: username.to_string(),
        iat: now as usize,
        exp: (now + TOKEN_TTL_SECS) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verifies signature and expiry. Any failure is `Forbidden`: the caller did
/// present a credential, it just is not acceptable.
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                kind => tracing::debug!(?kind, "rejected invalid token"),
            }
            ApiError::Forbidden
        })
}

/// Pulls the token out of `Authorization: Bearer <token>`. A missing header,
/// another scheme, or an empty token is `Unauthorized`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let (scheme, token) = value.split_once(' ').ok_or(ApiError::Unauthorized)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(ApiError::Unauthorized);
    }
    Ok(token)
}

/// require_auth
///
/// Middleware for the authenticated router. Rejects with 401 when no token is
/// sent and 403 when the token does not verify; otherwise stores the caller's
/// `AuthUser` on the request and hands over to the handler.
pub async fn require_auth(
    State(config): State<AppConfig>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())?;
    let claims = verify_token(&config.jwt_secret, token)?;

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}

/// Lets handlers on the authenticated router take `AuthUser` as an argument.
/// Outside that router there is no identity to find and the extractor rejects.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}
