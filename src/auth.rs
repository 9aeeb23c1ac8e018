//! Password hashing, bearer tokens, and the request identity extractors.
//!
//! Tokens are HS256 JWTs carrying the user id in `sub`, valid for 7 days and
//! verified purely against the process-wide secret. There is no revocation
//! list and no refresh mechanism. Identity reaches handlers as an explicit
//! extractor value, never as ambient state.

use argon2::Config as ArgonConfig;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

/// Token lifetime: 7 days.
const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// Expiry as a UTC timestamp.
    pub exp: usize,
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill(&mut salt);
    argon2::hash_encoded(password.as_bytes(), &salt, &ArgonConfig::default())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    argon2::verify_encoded(hash, password.as_bytes()).unwrap_or(false)
}

pub fn issue_token(user_id: i64, secret: &str) -> Result<String, AppError> {
    let exp = (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
}

/// Verifies a token's signature and expiry and returns the user id it
/// carries.
pub fn verify_token(token: &str, secret: &str) -> Result<i64, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("invalid or expired token".to_string()))?;

    data.claims
        .sub
        .parse()
        .map_err(|_| AppError::Unauthorized("invalid or expired token".to_string()))
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Identity required: rejects with `Unauthorized` when the bearer token is
/// missing or fails verification.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;
        let user_id = verify_token(token, &state.jwt_secret)?;
        Ok(AuthUser(user_id))
    }
}

/// Identity when present: yields the user id for a valid bearer token and
/// `None` otherwise. Used on routes that serve both anonymous and
/// authenticated callers.
#[derive(Debug, Clone, Copy)]
pub struct OptionalAuth(pub Option<i64>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let user_id =
            bearer_token(parts).and_then(|token| verify_token(token, &state.jwt_secret).ok());
        Ok(OptionalAuth(user_id))
    }
}
