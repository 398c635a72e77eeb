// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned inputs shared by engine and gateway tests.

use feedstr_core::{FeedItem, Icon, ParsedFeed, Timestamp};

/// Server-wide secret used for identity derivation in tests.
pub const TEST_SECRET: &str = "feedstr-test-secret";

/// Hex private key of the service identity in tests.
pub const SERVICE_PRIVATE_KEY: &str =
    "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

/// Feed URL used by the end-to-end scenarios.
pub const EXAMPLE_FEED_URL: &str = "https://example.com/feed.xml";

pub fn item(guid: &str, title: &str, published: Timestamp) -> FeedItem {
    FeedItem {
        title: title.to_string(),
        description: format!("<p>About {title}</p>"),
        link: format!("https://example.com/posts/{guid}"),
        guid: Some(guid.to_string()),
        published: Some(published),
        updated: None,
        comments: None,
    }
}

/// A feed whose site is `https://example.com/` with the given items.
pub fn feed_with_items(items: Vec<FeedItem>) -> ParsedFeed {
    ParsedFeed {
        title: "Example Blog".to_string(),
        description: "Posts about things".to_string(),
        link: "https://example.com/".to_string(),
        image_url: None,
        items,
    }
}

/// The end-to-end feed: two items published at t=100 and t=200.
pub fn example_feed() -> ParsedFeed {
    feed_with_items(vec![item("2", "Second", 200), item("1", "First", 100)])
}

pub fn png_icon(url: &str) -> Icon {
    Icon {
        url: url.to_string(),
        content_type: "image/png".to_string(),
        bytes: b"\x89PNG\r\n\x1a\n".to_vec(),
    }
}
