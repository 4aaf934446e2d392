// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (accounts, credentials, refresh-token rotation)
//! - Subscriptions (subscriber/channel join records)
//! - Videos (playback bookkeeping and watch history)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Subscription, User, Video};
use firestore::paths;
use futures_util::{stream, FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const MAX_CONCURRENT_DB_OPS: usize = 20;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by document ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by email address.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let mut users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("email").eq(email.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.pop())
    }

    /// Find a user by (already lowercased) username.
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let username = username.to_string();
        let mut users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("username").eq(username.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.pop())
    }

    /// Fetch several users by ID concurrently; absent ids are simply missing
    /// from the returned map.
    pub async fn get_users_by_ids(
        &self,
        user_ids: &[String],
    ) -> Result<HashMap<String, User>, AppError> {
        let client = self.get_client()?;

        let results: Vec<Result<Option<User>, AppError>> = stream::iter(user_ids.to_vec())
            .map(|id| async move {
                client
                    .fluent()
                    .select()
                    .by_id_in(collections::USERS)
                    .obj()
                    .one(&id)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect()
            .await;

        let mut users = HashMap::new();
        for result in results {
            if let Some(user) = result? {
                users.insert(user.id.clone(), user);
            }
        }
        Ok(users)
    }

    /// Store a newly registered user.
    ///
    /// Email/username uniqueness is checked by the caller before this write.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Set or clear the stored refresh token.
    ///
    /// Field-masked write: concurrent updates to other fields of the same
    /// user (e.g. a password change) are not clobbered.
    pub async fn set_refresh_token(
        &self,
        user_id: &str,
        token: Option<&str>,
    ) -> Result<(), AppError> {
        #[derive(Serialize, Deserialize)]
        struct Patch {
            refresh_token: Option<String>,
        }

        let patch = Patch {
            refresh_token: token.map(|t| t.to_string()),
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths!(User::{refresh_token}))
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&patch)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Replace the stored refresh token only if it still equals `expected`.
    ///
    /// Runs inside a Firestore transaction so the read is registered for
    /// conflict detection: of two racing rotations on the same stale token,
    /// the loser's re-run observes the winner's token and returns `false`.
    pub async fn conditional_update_refresh_token(
        &self,
        user_id: &str,
        expected: &str,
        new_token: &str,
    ) -> Result<bool, AppError> {
        let client = self.get_client()?;

        let swapped = client
            .run_transaction(|db, transaction| {
                let user_id = user_id.to_string();
                let expected = expected.to_string();
                let new_token = new_token.to_string();
                async move {
                    let user: Option<User> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&user_id)
                        .await?;

                    let Some(mut user) = user else {
                        return Ok(false);
                    };
                    if user.refresh_token.as_deref() != Some(expected.as_str()) {
                        return Ok(false);
                    }

                    user.refresh_token = Some(new_token);
                    db.fluent()
                        .update()
                        .fields(paths!(User::{refresh_token}))
                        .in_col(collections::USERS)
                        .document_id(&user_id)
                        .object(&user)
                        .add_to_transaction(transaction)?;

                    Ok(true)
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(swapped)
    }

    /// Replace the stored password hash.
    pub async fn update_password(&self, user_id: &str, password_hash: &str) -> Result<(), AppError> {
        #[derive(Serialize, Deserialize)]
        struct Patch {
            password: String,
            updated_at: String,
        }

        let patch = Patch {
            password: password_hash.to_string(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths!(User::{password, updated_at}))
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&patch)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Update email and display name.
    pub async fn update_account_details(
        &self,
        user_id: &str,
        email: &str,
        full_name: &str,
    ) -> Result<(), AppError> {
        #[derive(Serialize, Deserialize)]
        struct Patch {
            email: String,
            full_name: String,
            updated_at: String,
        }

        let patch = Patch {
            email: email.to_string(),
            full_name: full_name.to_string(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths!(User::{email, full_name, updated_at}))
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&patch)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Update the avatar URL.
    pub async fn update_avatar(&self, user_id: &str, avatar: &str) -> Result<(), AppError> {
        #[derive(Serialize, Deserialize)]
        struct Patch {
            avatar: String,
            updated_at: String,
        }

        let patch = Patch {
            avatar: avatar.to_string(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths!(User::{avatar, updated_at}))
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&patch)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Update the cover image URL.
    pub async fn update_cover_image(&self, user_id: &str, cover_image: &str) -> Result<(), AppError> {
        #[derive(Serialize, Deserialize)]
        struct Patch {
            cover_image: Option<String>,
            updated_at: String,
        }

        let patch = Patch {
            cover_image: Some(cover_image.to_string()),
            updated_at: chrono::Utc::now().to_rfc3339(),
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths!(User::{cover_image, updated_at}))
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&patch)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Subscription Operations ─────────────────────────────────

    /// Get the subscription edge between a subscriber and a channel.
    pub async fn get_subscription(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> Result<Option<Subscription>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SUBSCRIPTIONS)
            .obj()
            .one(&Subscription::doc_id_for(subscriber_id, channel_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a subscription edge.
    pub async fn create_subscription(&self, subscription: &Subscription) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SUBSCRIPTIONS)
            .document_id(subscription.doc_id())
            .object(subscription)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a subscription edge.
    pub async fn delete_subscription(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::SUBSCRIPTIONS)
            .document_id(Subscription::doc_id_for(subscriber_id, channel_id))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// All subscriptions targeting a channel (its subscriber set).
    pub async fn subscriptions_to_channel(
        &self,
        channel_id: &str,
    ) -> Result<Vec<Subscription>, AppError> {
        let channel_id = channel_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SUBSCRIPTIONS)
            .filter(move |q| q.for_all([q.field("channel_id").eq(channel_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// How many channels a user is subscribed to.
    pub async fn count_channels_subscribed_to(
        &self,
        subscriber_id: &str,
    ) -> Result<usize, AppError> {
        let subscriber_id = subscriber_id.to_string();
        let subscriptions: Vec<Subscription> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SUBSCRIPTIONS)
            .filter(move |q| q.for_all([q.field("subscriber_id").eq(subscriber_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(subscriptions.len())
    }

    // ─── Video Operations ────────────────────────────────────────

    /// Get a video by document ID.
    pub async fn get_video(&self, video_id: &str) -> Result<Option<Video>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::VIDEOS)
            .obj()
            .one(video_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace a video document.
    pub async fn upsert_video(&self, video: &Video) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::VIDEOS)
            .document_id(&video.id)
            .object(video)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a video document. Ids already sitting in watch histories keep
    /// pointing at it; the history projector skips them.
    pub async fn delete_video(&self, video_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::VIDEOS)
            .document_id(video_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Fetch several videos by ID concurrently; deleted ids are simply
    /// missing from the returned map.
    pub async fn get_videos_by_ids(
        &self,
        video_ids: &[String],
    ) -> Result<HashMap<String, Video>, AppError> {
        let client = self.get_client()?;

        let results: Vec<Result<Option<Video>, AppError>> = stream::iter(video_ids.to_vec())
            .map(|id| async move {
                client
                    .fluent()
                    .select()
                    .by_id_in(collections::VIDEOS)
                    .obj()
                    .one(&id)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect()
            .await;

        let mut videos = HashMap::new();
        for result in results {
            if let Some(video) = result? {
                videos.insert(video.id.clone(), video);
            }
        }
        Ok(videos)
    }

    /// Record a playback: bump the view count and move the video id to the
    /// front of the viewer's watch history (deduplicated).
    ///
    /// Both writes happen in one transaction so a concurrent playback for
    /// the same viewer cannot drop either update. Returns the video with the
    /// bumped count, or `None` if it no longer exists.
    pub async fn record_watch(
        &self,
        user_id: &str,
        video_id: &str,
    ) -> Result<Option<Video>, AppError> {
        let client = self.get_client()?;

        let watched = client
            .run_transaction(|db, transaction| {
                let user_id = user_id.to_string();
                let video_id = video_id.to_string();
                async move {
                    let video: Option<Video> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::VIDEOS)
                        .obj()
                        .one(&video_id)
                        .await?;
                    let Some(mut video) = video else {
                        return Ok(None);
                    };
                    // Unpublished videos are visible to their owner only;
                    // everyone else sees the same 404 as a missing id.
                    if !video.is_published && video.owner_id != user_id {
                        return Ok(None);
                    }

                    let user: Option<User> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&user_id)
                        .await?;
                    let Some(mut user) = user else {
                        return Ok(None);
                    };

                    video.views += 1;
                    db.fluent()
                        .update()
                        .fields(paths!(Video::{views}))
                        .in_col(collections::VIDEOS)
                        .document_id(&video_id)
                        .object(&video)
                        .add_to_transaction(transaction)?;

                    user.watch_history.retain(|id| id != &video_id);
                    user.watch_history.insert(0, video_id.clone());
                    db.fluent()
                        .update()
                        .fields(paths!(User::{watch_history}))
                        .in_col(collections::USERS)
                        .document_id(&user_id)
                        .object(&user)
                        .add_to_transaction(transaction)?;

                    Ok(Some(video))
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(watched)
    }
}
