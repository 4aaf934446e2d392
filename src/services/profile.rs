// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile read-models and account updates.
//!
//! The channel-profile and watch-history views are computed on demand by
//! joining users against subscription and video records; nothing here is
//! persisted. The join assembly is kept in pure functions over fetched
//! records.

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{ChannelProfile, PublicUser, Subscription, User, Video, VideoOwner, WatchHistoryEntry};
use crate::services::media::MediaService;
use crate::services::session::FileUpload;
use std::collections::HashMap;

/// Profile projector and account-detail updater.
#[derive(Clone)]
pub struct ProfileService {
    db: FirestoreDb,
    media: MediaService,
}

impl ProfileService {
    pub fn new(db: FirestoreDb, media: MediaService) -> Self {
        Self { db, media }
    }

    /// The authenticated user's own public record.
    pub async fn current_user(&self, user_id: &str) -> Result<PublicUser> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
        Ok(user.into())
    }

    /// Update display name and email.
    pub async fn update_account(
        &self,
        user_id: &str,
        full_name: &str,
        email: &str,
    ) -> Result<PublicUser> {
        let full_name = full_name.trim();
        let email = email.trim();
        if full_name.is_empty() || email.is_empty() {
            return Err(AppError::Validation("All fields are required".to_string()));
        }

        let mut user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        self.db.update_account_details(user_id, email, full_name).await?;

        user.email = email.to_string();
        user.full_name = full_name.to_string();
        Ok(user.into())
    }

    /// Replace the avatar: upload the new image, persist its URL, then
    /// best-effort delete the replaced asset.
    pub async fn update_avatar(&self, user_id: &str, upload: FileUpload) -> Result<PublicUser> {
        let mut user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let asset = self.media.upload(upload.bytes, &upload.filename).await?;
        self.db.update_avatar(user_id, &asset.url).await?;

        let previous = std::mem::replace(&mut user.avatar, asset.url);
        self.cleanup_replaced_asset(&previous).await;

        Ok(user.into())
    }

    /// Replace the cover image; same flow as the avatar.
    pub async fn update_cover_image(&self, user_id: &str, upload: FileUpload) -> Result<PublicUser> {
        let mut user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let asset = self.media.upload(upload.bytes, &upload.filename).await?;
        self.db.update_cover_image(user_id, &asset.url).await?;

        let previous = user.cover_image.replace(asset.url);
        if let Some(previous) = previous {
            self.cleanup_replaced_asset(&previous).await;
        }

        Ok(user.into())
    }

    /// Delete a replaced image. The profile update is already committed, so
    /// a failed delete is logged and swallowed, never rolled back.
    async fn cleanup_replaced_asset(&self, url: &str) {
        match self.media.delete(url).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(url = %url, "Hosting refused to delete replaced image"),
            Err(err) => tracing::warn!(url = %url, error = %err, "Failed to delete replaced image"),
        }
    }

    /// Build the public channel profile for a username, as seen by an
    /// optional viewer.
    pub async fn get_channel_profile(
        &self,
        username: &str,
        viewer_id: Option<&str>,
    ) -> Result<ChannelProfile> {
        let username = username.trim().to_lowercase();
        if username.is_empty() {
            return Err(AppError::Validation("Username is required".to_string()));
        }

        let user = self
            .db
            .find_user_by_username(&username)
            .await?
            .ok_or_else(|| AppError::NotFound("Channel not found".to_string()))?;

        // Two-pass join: once with the channel on the subscribed-to side,
        // once with it on the subscriber side.
        let subscribers = self.db.subscriptions_to_channel(&user.id).await?;
        let subscribed_to_count = self.db.count_channels_subscribed_to(&user.id).await?;

        Ok(assemble_channel_profile(
            user,
            &subscribers,
            subscribed_to_count,
            viewer_id,
        ))
    }

    /// Resolve a user's watch history to enriched video records, in stored
    /// order. A missing user or empty history yields an empty sequence.
    pub async fn get_watch_history(&self, user_id: &str) -> Result<Vec<WatchHistoryEntry>> {
        let Some(user) = self.db.get_user(user_id).await? else {
            return Ok(Vec::new());
        };
        if user.watch_history.is_empty() {
            return Ok(Vec::new());
        }

        let videos = self.db.get_videos_by_ids(&user.watch_history).await?;

        let mut owner_ids: Vec<String> = videos.values().map(|v| v.owner_id.clone()).collect();
        owner_ids.sort();
        owner_ids.dedup();
        let owners = self.db.get_users_by_ids(&owner_ids).await?;

        Ok(assemble_watch_history(&user.watch_history, videos, &owners))
    }
}

/// Join a channel's user record with its subscription sets.
fn assemble_channel_profile(
    user: User,
    subscribers: &[Subscription],
    channels_subscribed_to_count: usize,
    viewer_id: Option<&str>,
) -> ChannelProfile {
    let is_subscribed = viewer_id
        .map(|viewer| subscribers.iter().any(|s| s.subscriber_id == viewer))
        .unwrap_or(false);

    ChannelProfile {
        id: user.id,
        email: user.email,
        username: user.username,
        full_name: user.full_name,
        avatar: user.avatar,
        cover_image: user.cover_image,
        subscribers_count: subscribers.len(),
        channels_subscribed_to_count,
        is_subscribed,
    }
}

/// Resolve the watch-history id sequence against fetched videos and owners.
/// Order follows the id sequence exactly; ids whose video has been deleted
/// are skipped.
fn assemble_watch_history(
    history: &[String],
    mut videos: HashMap<String, Video>,
    owners: &HashMap<String, User>,
) -> Vec<WatchHistoryEntry> {
    history
        .iter()
        .filter_map(|id| videos.remove(id))
        .map(|video| {
            let owner = owners.get(&video.owner_id).map(|user| VideoOwner {
                id: user.id.clone(),
                username: user.username.clone(),
                avatar: user.avatar.clone(),
                full_name: user.full_name.clone(),
            });
            WatchHistoryEntry::new(video, owner)
        })
        .collect()
}
