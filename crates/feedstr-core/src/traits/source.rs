// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feed retrieval and site probing.

use async_trait::async_trait;

use crate::error::FeedstrError;
use crate::feed::{Icon, ParsedFeed};

/// Fetches and parses a syndication feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed, FeedstrError>;
}

/// Probes a website for its feed URL and icon.
///
/// Both operations are best-effort: any failure yields `None`.
#[async_trait]
pub trait SiteProbe: Send + Sync {
    /// Resolve the feed URL behind `url`, which may be the feed itself or an
    /// HTML page advertising it.
    async fn discover_feed_url(&self, url: &str) -> Option<String>;

    /// Find and download an icon for the site at `site_url`, falling back to
    /// the host of `feed_url`.
    async fn find_icon(&self, site_url: &str, feed_url: &str) -> Option<Icon>;
}
