//! Subscription join records: subscriber follows channel.

use serde::{Deserialize, Serialize};

/// One subscription edge, stored under the composite document id
/// `{subscriber_id}_{channel_id}` so the same pair can never subscribe
/// twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// The following user's document ID
    pub subscriber_id: String,
    /// The followed channel's (user's) document ID
    pub channel_id: String,
    /// When the subscription was created (RFC 3339)
    pub created_at: String,
}

impl Subscription {
    /// Composite document id for this edge.
    pub fn doc_id(&self) -> String {
        Self::doc_id_for(&self.subscriber_id, &self.channel_id)
    }

    pub fn doc_id_for(subscriber_id: &str, channel_id: &str) -> String {
        format!("{}_{}", subscriber_id, channel_id)
    }
}
