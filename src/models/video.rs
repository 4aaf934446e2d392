//! Video model and the enriched watch-history projection.

use serde::{Deserialize, Serialize};

/// Video stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    /// Document ID (UUID v4)
    pub id: String,
    /// Owning user's document ID
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Hosted video file URL
    pub video_file: String,
    /// Hosted thumbnail URL
    pub thumbnail: String,
    /// Duration in seconds
    pub duration_secs: u32,
    /// Total playback count
    #[serde(default)]
    pub views: u64,
    pub is_published: bool,
    /// When the video was uploaded (RFC 3339)
    pub created_at: String,
}

/// Condensed owner record attached to each watch-history entry.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoOwner {
    pub id: String,
    pub username: String,
    pub avatar: String,
    pub full_name: String,
}

/// A watched video enriched with its owner. The owner is `None` when the
/// owning account no longer exists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchHistoryEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    pub duration_secs: u32,
    pub views: u64,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<VideoOwner>,
}

impl WatchHistoryEntry {
    /// Build an entry from a video and its (possibly deleted) owner.
    pub fn new(video: Video, owner: Option<VideoOwner>) -> Self {
        Self {
            id: video.id,
            title: video.title,
            description: video.description,
            video_file: video.video_file,
            thumbnail: video.thumbnail,
            duration_secs: video.duration_secs,
            views: video.views,
            created_at: video.created_at,
            owner,
        }
    }
}
