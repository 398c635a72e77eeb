// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsed feed model and the tracked-feed entity.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// A syndication feed after parsing, independent of its source format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    pub title: String,
    pub description: String,
    /// Link to the website the feed belongs to.
    pub link: String,
    pub image_url: Option<String>,
    pub items: Vec<FeedItem>,
}

/// One entry of a parsed feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    /// Item body, usually HTML.
    pub description: String,
    pub link: String,
    pub guid: Option<String>,
    pub published: Option<Timestamp>,
    pub updated: Option<Timestamp>,
    pub comments: Option<String>,
}

impl FeedItem {
    /// Source timestamp, preferring the update time over publication.
    pub fn source_time(&self) -> Option<Timestamp> {
        self.updated.or(self.published)
    }
}

/// A site icon downloaded during registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub url: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Icon {
    /// File extension matching the icon's content type.
    pub fn extension(&self) -> &'static str {
        let ct = self.content_type.to_ascii_lowercase();
        if ct.contains("png") {
            "png"
        } else if ct.contains("svg") {
            "svg"
        } else if ct.contains("gif") {
            "gif"
        } else if ct.contains("jpeg") || ct.contains("jpg") {
            "jpg"
        } else if ct.contains("webp") {
            "webp"
        } else {
            "ico"
        }
    }
}

/// A tracked feed together with its derived identity and polling state.
///
/// Stored as JSON inside the aggregate record; the private key must never
/// leave the service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntity {
    pub pubkey: String,
    pub private_key: String,
    pub url: String,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Watermark: newest item timestamp already published.
    #[serde(default)]
    pub last_post_time: Timestamp,
    #[serde(default)]
    pub last_checked_time: Timestamp,
    /// Learned cadence in seconds.
    #[serde(default)]
    pub avg_post_interval: i64,
}

impl std::fmt::Debug for FeedEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedEntity")
            .field("pubkey", &self.pubkey)
            .field("private_key", &"[redacted]")
            .field("url", &self.url)
            .field("image_url", &self.image_url)
            .field("last_post_time", &self.last_post_time)
            .field("last_checked_time", &self.last_checked_time)
            .field("avg_post_interval", &self.avg_post_interval)
            .finish()
    }
}
