//! User model for storage and API projections.

use serde::{Deserialize, Serialize};

/// User account stored in Firestore.
///
/// `password` holds the argon2id hash, never the plain text. `refresh_token`
/// holds the single active refresh token; any previously issued token stops
/// being honored the moment this field is overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Document ID (UUID v4)
    pub id: String,
    /// Email address (unique)
    pub email: String,
    /// Username (unique, stored lowercased)
    pub username: String,
    /// Display name
    pub full_name: String,
    /// Argon2id password hash
    pub password: String,
    /// Avatar image URL
    pub avatar: String,
    /// Cover image URL
    pub cover_image: Option<String>,
    /// Currently active refresh token, if logged in
    pub refresh_token: Option<String>,
    /// Watched video ids, most recent first
    #[serde(default)]
    pub watch_history: Vec<String>,
    /// When the account was created (RFC 3339)
    pub created_at: String,
    /// Last profile/credential update (RFC 3339)
    pub updated_at: String,
}

/// Public view of a user: everything except credentials and history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub created_at: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            full_name: user.full_name,
            avatar: user.avatar,
            cover_image: user.cover_image,
            created_at: user.created_at,
        }
    }
}

/// Channel profile projection: public fields joined with subscription
/// counts. Computed on demand, never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub id: String,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub subscribers_count: usize,
    pub channels_subscribed_to_count: usize,
    pub is_subscribed: bool,
}
