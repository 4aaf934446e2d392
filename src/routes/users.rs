// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User account, session and profile routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ChannelProfile, PublicUser, WatchHistoryEntry};
use crate::services::session::{FileUpload, LoginInput, RegisterInput};
use crate::AppState;
use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Image uploads (avatar/cover) may exceed the default JSON body limit.
const MAX_IMAGE_UPLOAD_BYTES: usize = 8 * 1024 * 1024;

/// Public user routes (no auth required).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/v1/users/register",
            post(register).layer(DefaultBodyLimit::max(MAX_IMAGE_UPLOAD_BYTES)),
        )
        .route("/api/v1/users/login", post(login))
        .route("/api/v1/users/refresh-token", post(refresh_token))
}

/// User routes that require authentication.
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/users/logout", post(logout))
        .route("/api/v1/users/current-user", get(current_user))
        .route("/api/v1/users/change-password", patch(change_password))
        .route("/api/v1/users/update", patch(update_account))
        .route(
            "/api/v1/users/update-avatar",
            post(update_avatar).layer(DefaultBodyLimit::max(MAX_IMAGE_UPLOAD_BYTES)),
        )
        .route(
            "/api/v1/users/update-cover-image",
            post(update_cover_image).layer(DefaultBodyLimit::max(MAX_IMAGE_UPLOAD_BYTES)),
        )
        .route("/api/v1/users/c/{username}", get(channel_profile))
        .route("/api/v1/users/watch-history", get(watch_history))
}

// ─── Cookies ─────────────────────────────────────────────────

/// Build an auth cookie with the attributes shared by issue and removal.
fn auth_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Set both session cookies. Access and refresh tokens each go under their
/// own name.
fn with_session_cookies(
    jar: CookieJar,
    access_token: String,
    refresh_token: String,
    secure: bool,
) -> CookieJar {
    jar.add(auth_cookie("accessToken", access_token, secure))
        .add(auth_cookie("refreshToken", refresh_token, secure))
}

// ─── Registration & Session ──────────────────────────────────

async fn read_file_field(field: Field<'_>) -> Result<FileUpload> {
    let filename = field.file_name().unwrap_or("upload").to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {}", e)))?
        .to_vec();
    Ok(FileUpload { filename, bytes })
}

async fn read_text_field(field: Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed form field: {}", e)))
}

/// Register a new account from a multipart form (text fields plus the
/// avatar and optional cover image files).
async fn register(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PublicUser>)> {
    let mut input = RegisterInput {
        email: String::new(),
        username: String::new(),
        full_name: String::new(),
        password: String::new(),
        avatar: None,
        cover_image: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "email" => input.email = read_text_field(field).await?,
            "username" => input.username = read_text_field(field).await?,
            "fullName" => input.full_name = read_text_field(field).await?,
            "password" => input.password = read_text_field(field).await?,
            "avatar" => input.avatar = Some(read_file_field(field).await?),
            "coverImage" => input.cover_image = Some(read_file_field(field).await?),
            _ => {}
        }
    }

    let user = state.session.register(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    user: PublicUser,
}

/// Log in with email or username. Tokens ride in the session cookies; the
/// body carries only the public user record.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let (user, tokens) = state
        .session
        .login(LoginInput {
            email: body.email,
            username: body.username,
            password: body.password,
        })
        .await?;

    let jar = with_session_cookies(
        jar,
        tokens.access_token,
        tokens.refresh_token,
        state.config.cookie_secure,
    );
    Ok((jar, Json(LoginResponse { user })))
}

/// Clear the stored refresh token and remove both session cookies.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar)> {
    state.session.logout(&user.user_id).await?;

    let secure = state.config.cookie_secure;
    let jar = jar
        .remove(auth_cookie("accessToken", String::new(), secure))
        .remove(auth_cookie("refreshToken", String::new(), secure));
    Ok((StatusCode::NO_CONTENT, jar))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenPairResponse {
    access_token: String,
    refresh_token: String,
}

/// Rotate the refresh token. Accepts the token from the cookie or the
/// request body; re-issues both cookies on success.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: axum::body::Bytes,
) -> Result<(CookieJar, Json<TokenPairResponse>)> {
    let presented = jar
        .get("refreshToken")
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            serde_json::from_slice::<RefreshRequest>(&body)
                .ok()
                .and_then(|b| b.refresh_token)
        });

    let Some(presented) = presented else {
        return Err(AppError::Validation("Refresh token is required".to_string()));
    };

    let tokens = state.session.refresh(&presented).await?;

    let response = TokenPairResponse {
        access_token: tokens.access_token.clone(),
        refresh_token: tokens.refresh_token.clone(),
    };
    let jar = with_session_cookies(
        jar,
        tokens.access_token,
        tokens.refresh_token,
        state.config.cookie_secure,
    );
    Ok((jar, Json(response)))
}

// ─── Account ─────────────────────────────────────────────────

async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<PublicUser>> {
    Ok(Json(state.profile.current_user(&user.user_id).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    #[serde(default)]
    current_password: String,
    #[serde(default)]
    new_password: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    state
        .session
        .change_password(&user.user_id, &body.current_password, &body.new_password)
        .await?;
    Ok(Json(MessageResponse {
        message: "Password changed successfully".to_string(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAccountRequest {
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    email: String,
}

async fn update_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<UpdateAccountRequest>,
) -> Result<Json<PublicUser>> {
    let updated = state
        .profile
        .update_account(&user.user_id, &body.full_name, &body.email)
        .await?;
    Ok(Json(updated))
}

/// Pull the single expected file out of a multipart form.
async fn single_file(multipart: &mut Multipart, field_name: &str) -> Result<Option<FileUpload>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some(field_name) {
            return Ok(Some(read_file_field(field).await?));
        }
    }
    Ok(None)
}

async fn update_avatar(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<PublicUser>> {
    let Some(upload) = single_file(&mut multipart, "avatar").await? else {
        return Err(AppError::Validation("Avatar is required".to_string()));
    };
    let updated = state.profile.update_avatar(&user.user_id, upload).await?;
    Ok(Json(updated))
}

async fn update_cover_image(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<PublicUser>> {
    let Some(upload) = single_file(&mut multipart, "coverImage").await? else {
        return Err(AppError::Validation("Cover image is required".to_string()));
    };
    let updated = state
        .profile
        .update_cover_image(&user.user_id, upload)
        .await?;
    Ok(Json(updated))
}

// ─── Projections ─────────────────────────────────────────────

async fn channel_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(username): Path<String>,
) -> Result<Json<ChannelProfile>> {
    let profile = state
        .profile
        .get_channel_profile(&username, Some(&user.user_id))
        .await?;
    Ok(Json(profile))
}

async fn watch_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<WatchHistoryEntry>>> {
    Ok(Json(state.profile.get_watch_history(&user.user_id).await?))
}
