// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session management: registration, login, logout, refresh-token rotation
//! and password changes.
//!
//! At most one refresh token is valid per user at any time. Login overwrites
//! the stored token unconditionally; refresh replaces it with compare-and-swap
//! semantics so a superseded token can never be replayed.

use crate::config::Config;
use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{PublicUser, User};
use crate::services::media::MediaService;
use crate::services::{password, token};

/// An uploaded file staged in memory by the transport layer.
pub struct FileUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Registration input. Avatar is mandatory, cover image optional.
pub struct RegisterInput {
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub password: String,
    pub avatar: Option<FileUpload>,
    pub cover_image: Option<FileUpload>,
}

/// Login input: at least one of email/username plus the password.
pub struct LoginInput {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: String,
}

/// A freshly issued access/refresh token pair.
#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Session manager, orchestrating the credential store, the password
/// verifier and the token issuer.
#[derive(Clone)]
pub struct SessionService {
    db: FirestoreDb,
    media: MediaService,
    config: Config,
}

impl SessionService {
    pub fn new(db: FirestoreDb, media: MediaService, config: Config) -> Self {
        Self { db, media, config }
    }

    /// Register a new user.
    ///
    /// The duplicate-email check runs (and reports) before the
    /// duplicate-username check. The returned record carries no credential
    /// fields.
    pub async fn register(&self, input: RegisterInput) -> Result<PublicUser> {
        let email = input.email.trim().to_string();
        let username = input.username.trim().to_lowercase();
        let full_name = input.full_name.trim().to_string();

        if email.is_empty()
            || username.is_empty()
            || full_name.is_empty()
            || input.password.trim().is_empty()
        {
            return Err(AppError::Validation("All fields are required".to_string()));
        }

        if self.db.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(
                "User with same email already exists".to_string(),
            ));
        }
        if self.db.find_user_by_username(&username).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "User with same username = {} already exists",
                username
            )));
        }

        let Some(avatar) = input.avatar else {
            return Err(AppError::Validation("Avatar file is required".to_string()));
        };
        let avatar_url = self.media.upload(avatar.bytes, &avatar.filename).await?.url;

        let cover_image_url = match input.cover_image {
            Some(cover) => Some(self.media.upload(cover.bytes, &cover.filename).await?.url),
            None => None,
        };

        let now = chrono::Utc::now().to_rfc3339();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            username,
            full_name,
            password: password::hash_password(&input.password)?,
            avatar: avatar_url,
            cover_image: cover_image_url,
            refresh_token: None,
            watch_history: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };

        self.db.create_user(&user).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(user.into())
    }

    /// Log a user in by email or username.
    ///
    /// On success a fresh token pair is issued and the refresh token is
    /// persisted, unconditionally superseding any previously stored one.
    pub async fn login(&self, input: LoginInput) -> Result<(PublicUser, TokenPair)> {
        let email = input.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
        let username = input
            .username
            .as_deref()
            .map(|u| u.trim().to_lowercase())
            .filter(|u| !u.is_empty());

        if email.is_none() && username.is_none() {
            return Err(AppError::Validation(
                "Username or email is required".to_string(),
            ));
        }

        let mut user = None;
        if let Some(email) = email {
            user = self.db.find_user_by_email(email).await?;
        }
        if user.is_none() {
            if let Some(username) = &username {
                user = self.db.find_user_by_username(username).await?;
            }
        }
        let user = user.ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

        if !password::verify_password(&input.password, &user.password) {
            return Err(AppError::Auth("Invalid credentials".to_string()));
        }

        let pair = self.issue_pair(&user.id)?;
        self.db
            .set_refresh_token(&user.id, Some(&pair.refresh_token))
            .await?;

        tracing::info!(user_id = %user.id, "Login success");
        Ok((user.into(), pair))
    }

    /// Clear the stored refresh token. Idempotent: logging out twice, or
    /// while not logged in, is not an error.
    pub async fn logout(&self, user_id: &str) -> Result<()> {
        self.db.set_refresh_token(user_id, None).await?;
        tracing::info!(user_id = %user_id, "Logout");
        Ok(())
    }

    /// Rotate a refresh token: verify it, check it is the currently stored
    /// one, and atomically replace it with a fresh pair.
    ///
    /// Every failure on this path is reported as a uniform authentication
    /// failure so callers cannot probe which check rejected the token.
    pub async fn refresh(&self, presented: &str) -> Result<TokenPair> {
        self.rotate(presented).await.map_err(|err| {
            tracing::debug!(error = %err, "Refresh token rejected");
            AppError::Auth("Invalid refresh token".to_string())
        })
    }

    async fn rotate(&self, presented: &str) -> Result<TokenPair> {
        let claims = token::verify_token(presented, &self.config.refresh_token_secret)?;

        let user = self
            .db
            .get_user(&claims.sub)
            .await?
            .ok_or_else(|| AppError::Auth("Unknown user".to_string()))?;

        // Valid signature is not enough: a token superseded by a later
        // rotation no longer matches the stored value.
        if user.refresh_token.as_deref() != Some(presented) {
            return Err(AppError::Auth("Superseded refresh token".to_string()));
        }

        let pair = self.issue_pair(&user.id)?;
        let swapped = self
            .db
            .conditional_update_refresh_token(&user.id, presented, &pair.refresh_token)
            .await?;
        if !swapped {
            // Lost the race against a concurrent rotation.
            return Err(AppError::Auth("Superseded refresh token".to_string()));
        }

        tracing::info!(user_id = %user.id, "Refresh token rotated");
        Ok(pair)
    }

    /// Change a user's password.
    ///
    /// The current password must verify, and the new password must actually
    /// differ from it. The stored refresh token is left untouched.
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        if current_password.trim().is_empty() || new_password.trim().is_empty() {
            return Err(AppError::Validation("Both fields are required".to_string()));
        }

        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !password::verify_password(current_password, &user.password) {
            return Err(AppError::Auth("Incorrect password".to_string()));
        }
        if password::verify_password(new_password, &user.password) {
            return Err(AppError::Validation(
                "New password must differ from the current password".to_string(),
            ));
        }

        let new_hash = password::hash_password(new_password)?;
        self.db.update_password(user_id, &new_hash).await?;
        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    fn issue_pair(&self, user_id: &str) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: token::issue_access_token(user_id, &self.config)?,
            refresh_token: token::issue_refresh_token(user_id, &self.config)?,
        })
    }
}
