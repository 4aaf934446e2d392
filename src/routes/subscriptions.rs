// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Subscription;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::post,
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Subscription routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/v1/subscriptions/c/{channel_id}",
        post(toggle_subscription),
    )
}

#[derive(Serialize)]
struct ToggleResponse {
    subscribed: bool,
}

/// Subscribe to a channel, or unsubscribe if already subscribed.
async fn toggle_subscription(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(channel_id): Path<String>,
) -> Result<Json<ToggleResponse>> {
    if user.user_id == channel_id {
        return Err(AppError::Validation(
            "Cannot subscribe to your own channel".to_string(),
        ));
    }

    state
        .db
        .get_user(&channel_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Channel not found".to_string()))?;

    let subscribed = if state
        .db
        .get_subscription(&user.user_id, &channel_id)
        .await?
        .is_some()
    {
        state
            .db
            .delete_subscription(&user.user_id, &channel_id)
            .await?;
        false
    } else {
        let subscription = Subscription {
            subscriber_id: user.user_id.clone(),
            channel_id: channel_id.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        state.db.create_subscription(&subscription).await?;
        true
    };

    tracing::info!(
        subscriber = %user.user_id,
        channel = %channel_id,
        subscribed,
        "Subscription toggled"
    );

    Ok(Json(ToggleResponse { subscribed }))
}
