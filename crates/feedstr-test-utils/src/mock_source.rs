// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted feed source and site probe.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use feedstr_core::{FeedSource, FeedstrError, Icon, ParsedFeed, SiteProbe};

#[derive(Default)]
struct Script {
    feeds: HashMap<String, Result<ParsedFeed, String>>,
    discovery: HashMap<String, String>,
    icons: HashMap<String, Icon>,
    fetches: Vec<String>,
}

/// Serves canned feeds by URL.
///
/// A URL with a scripted feed is its own discovered feed URL; other URLs
/// resolve through [`MockFeedSource::set_discovery`]. Unscripted URLs fail
/// to fetch.
#[derive(Default)]
pub struct MockFeedSource {
    script: Mutex<Script>,
}

impl MockFeedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_feed(&self, url: &str, feed: ParsedFeed) {
        self.script
            .lock()
            .await
            .feeds
            .insert(url.to_string(), Ok(feed));
    }

    /// Make every fetch of `url` fail with `message`.
    pub async fn set_failure(&self, url: &str, message: &str) {
        self.script
            .lock()
            .await
            .feeds
            .insert(url.to_string(), Err(message.to_string()));
    }

    pub async fn set_discovery(&self, page_url: &str, feed_url: &str) {
        self.script
            .lock()
            .await
            .discovery
            .insert(page_url.to_string(), feed_url.to_string());
    }

    /// Icon returned for lookups whose site or feed URL is `url`.
    pub async fn set_icon(&self, url: &str, icon: Icon) {
        self.script.lock().await.icons.insert(url.to_string(), icon);
    }

    /// URLs fetched so far, in order.
    pub async fn fetches(&self) -> Vec<String> {
        self.script.lock().await.fetches.clone()
    }

    pub async fn fetch_count(&self, url: &str) -> usize {
        self.script
            .lock()
            .await
            .fetches
            .iter()
            .filter(|u| *u == url)
            .count()
    }
}

#[async_trait]
impl FeedSource for MockFeedSource {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed, FeedstrError> {
        let mut script = self.script.lock().await;
        script.fetches.push(url.to_string());
        match script.feeds.get(url) {
            Some(Ok(feed)) => Ok(feed.clone()),
            Some(Err(message)) => Err(FeedstrError::Fetch {
                url: url.to_string(),
                message: message.clone(),
            }),
            None => Err(FeedstrError::Fetch {
                url: url.to_string(),
                message: "no scripted feed".to_string(),
            }),
        }
    }
}

#[async_trait]
impl SiteProbe for MockFeedSource {
    async fn discover_feed_url(&self, url: &str) -> Option<String> {
        let script = self.script.lock().await;
        if script.feeds.contains_key(url) {
            return Some(url.to_string());
        }
        script.discovery.get(url).cloned()
    }

    async fn find_icon(&self, site_url: &str, feed_url: &str) -> Option<Icon> {
        let script = self.script.lock().await;
        script
            .icons
            .get(site_url)
            .or_else(|| script.icons.get(feed_url))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_feeds_are_served_and_counted() {
        let source = MockFeedSource::new();
        source.set_feed("https://a/feed", ParsedFeed::default()).await;
        source.set_failure("https://b/feed", "boom").await;

        assert!(source.fetch("https://a/feed").await.is_ok());
        assert!(source.fetch("https://b/feed").await.is_err());
        assert!(source.fetch("https://c/feed").await.is_err());
        assert_eq!(source.fetch_count("https://a/feed").await, 1);
        assert_eq!(source.fetches().await.len(), 3);
    }

    #[tokio::test]
    async fn discovery_resolves_feeds_and_pages() {
        let source = MockFeedSource::new();
        source.set_feed("https://a/feed", ParsedFeed::default()).await;
        source.set_discovery("https://a/", "https://a/feed").await;
        assert_eq!(
            source.discover_feed_url("https://a/").await.as_deref(),
            Some("https://a/feed")
        );
        assert_eq!(
            source.discover_feed_url("https://a/feed").await.as_deref(),
            Some("https://a/feed")
        );
        assert!(source.discover_feed_url("https://nowhere/").await.is_none());
    }
}
