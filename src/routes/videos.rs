// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Video playback routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Video;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Video routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/videos/{video_id}", get(watch_video))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoResponse {
    id: String,
    owner_id: String,
    title: String,
    description: String,
    video_file: String,
    thumbnail: String,
    duration_secs: u32,
    views: u64,
    created_at: String,
}

impl From<Video> for VideoResponse {
    fn from(video: Video) -> Self {
        Self {
            id: video.id,
            owner_id: video.owner_id,
            title: video.title,
            description: video.description,
            video_file: video.video_file,
            thumbnail: video.thumbnail,
            duration_secs: video.duration_secs,
            views: video.views,
            created_at: video.created_at,
        }
    }
}

/// Fetch a video for playback: bumps its view count and records it at the
/// front of the viewer's watch history.
async fn watch_video(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> Result<Json<VideoResponse>> {
    let video = state
        .db
        .record_watch(&user.user_id, &video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))?;

    Ok(Json(video.into()))
}
