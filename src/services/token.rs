// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token issuance and verification.
//!
//! Access and refresh tokens are both HS256 JWTs carrying the user id, but
//! they are signed with distinct secrets and lifetimes: an access token can
//! never be replayed as a refresh token or vice versa.

use crate::config::Config;
use crate::error::AppError;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user document ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Mint a short-lived access token for a user.
pub fn issue_access_token(user_id: &str, config: &Config) -> Result<String, AppError> {
    mint(user_id, &config.access_token_secret, config.access_token_ttl_secs)
}

/// Mint a long-lived refresh token for a user.
pub fn issue_refresh_token(user_id: &str, config: &Config) -> Result<String, AppError> {
    mint(user_id, &config.refresh_token_secret, config.refresh_token_ttl_secs)
}

fn mint(user_id: &str, secret: &[u8], ttl_secs: u64) -> Result<String, AppError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + ttl_secs as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Token encoding failed: {}", e)))
}

/// Verify a token against the given secret and return its claims.
///
/// Pure function of the token, the secret, and the current time: expired or
/// tampered tokens fail, nothing else is consulted.
pub fn verify_token(token: &str, secret: &[u8]) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(secret);
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::Auth("Invalid or expired token".to_string()))
}
