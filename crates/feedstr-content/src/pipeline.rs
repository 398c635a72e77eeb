// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of feeds and feed items into unsigned output records.

use feedstr_config::model::ContentConfig;
use feedstr_core::{kinds, FeedItem, ParsedFeed, Tag, Timestamp, UnsignedRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::markdown;
use crate::rules::{RuleSet, SubcommunityRule, TitleEchoRule};

/// Marker appended where a body was cut.
pub const ELLIPSIS: char = '…';

/// Body of a profile record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    pub name: String,
    pub about: String,
    pub picture: String,
}

/// Feed and item to record conversion with a configured rule set.
#[derive(Debug)]
pub struct ContentPipeline {
    rules: RuleSet,
    default_picture_url: String,
}

impl ContentPipeline {
    pub fn new(rules: RuleSet, default_picture_url: impl Into<String>) -> Self {
        Self {
            rules,
            default_picture_url: default_picture_url.into(),
        }
    }

    /// Build the rule set from the `[content]` config section.
    pub fn from_config(config: &ContentConfig, default_picture_url: impl Into<String>) -> Self {
        let mut rules = RuleSet::new();
        for aggregator in &config.aggregators {
            rules.push(Box::new(SubcommunityRule::new(
                aggregator.domain.clone(),
                aggregator.path_prefix.clone(),
            )));
        }
        rules.push(Box::new(TitleEchoRule::new(
            config.title_echo_domains.iter().cloned(),
        )));
        Self::new(rules, default_picture_url)
    }

    pub fn profile_metadata(
        &self,
        feed_url: &str,
        feed: &ParsedFeed,
        override_image_url: Option<&str>,
    ) -> ProfileMetadata {
        let title = match self.rules.display_name(feed) {
            Some(name) => name,
            None if !feed.title.trim().is_empty() => feed.title.trim().to_string(),
            None => feed_url.to_string(),
        };

        let mut description = feed.description.trim().to_string();
        if let Some(tag) = self.rules.hashtag(feed) {
            description.push_str(&format!(" #{tag}"));
        }
        let about = format!("{description}\n\n{}", feed.link);

        let picture = override_image_url
            .filter(|u| !u.is_empty())
            .or(feed.image_url.as_deref().filter(|u| !u.is_empty()))
            .unwrap_or(&self.default_picture_url)
            .to_string();

        ProfileMetadata {
            name: format!("{title} (RSS Feed)"),
            about,
            picture,
        }
    }

    /// Profile record presenting a feed as a publisher.
    pub fn feed_to_profile_record(
        &self,
        author: &str,
        feed_url: &str,
        feed: &ParsedFeed,
        override_image_url: Option<&str>,
        created_at: Timestamp,
    ) -> UnsignedRecord {
        let metadata = self.profile_metadata(feed_url, feed, override_image_url);
        UnsignedRecord {
            pubkey: author.to_string(),
            created_at,
            kind: kinds::PROFILE,
            tags: vec![Tag::new(["proxy", feed_url, "rss"])],
            content: clean_text(&profile_json(&metadata)),
        }
    }

    /// Canonical item record. Pure for fixed inputs and a fixed `default_created_at`.
    pub fn item_to_record(
        &self,
        author: &str,
        feed_url: &str,
        item: &FeedItem,
        feed: &ParsedFeed,
        max_length: usize,
        default_created_at: Timestamp,
    ) -> UnsignedRecord {
        let title = html_escape::decode_html_entities(item.title.trim());
        let title = title.trim();
        let mut body = String::new();
        if !title.is_empty() {
            body.push_str(&format!("**{title}**"));
        }

        let base = Url::parse(&item.link)
            .or_else(|_| Url::parse(&feed.link))
            .ok();
        let description = markdown::convert(&item.description, base.as_ref());

        if description.to_lowercase() == title.to_lowercase()
            || self.rules.echoes_title(feed, item)
        {
            debug!(link = %item.link, "description repeats the title, skipped");
        } else {
            push_paragraph(&mut body, &description);
        }

        if let Some(tag) = self.rules.hashtag(feed) {
            push_paragraph(&mut body, &format!("#{tag}"));
        }

        let mut body = truncate_body(&body, max_length);

        if let Some(comments) = item.comments.as_deref().filter(|c| !c.trim().is_empty()) {
            push_paragraph(&mut body, &format!("Comments: {}", comments.trim()));
        }
        push_paragraph(&mut body, item.link.trim());

        let created_at = item
            .updated
            .or(item.published)
            .unwrap_or(default_created_at);

        UnsignedRecord {
            pubkey: author.to_string(),
            created_at,
            kind: kinds::TEXT_NOTE,
            tags: vec![Tag::new([
                "proxy".to_string(),
                provenance(feed_url, item),
                "rss".to_string(),
            ])],
            content: clean_text(&body),
        }
    }
}

fn profile_json(metadata: &ProfileMetadata) -> String {
    // Serializing a struct of strings cannot fail.
    serde_json::to_string(metadata).unwrap_or_default()
}

fn push_paragraph(body: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !body.is_empty() {
        body.push_str("\n\n");
    }
    body.push_str(text);
}

/// Stable handle of an item: the feed URL plus its form-encoded guid, or
/// the bare feed URL when the item has no guid.
pub fn provenance(feed_url: &str, item: &FeedItem) -> String {
    match item.guid.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
        Some(guid) => {
            let escaped: String = url::form_urlencoded::byte_serialize(guid.as_bytes()).collect();
            format!("{feed_url}#{escaped}")
        }
        None => feed_url.to_string(),
    }
}

/// Cap `body` at `max_length` characters. A cut body ends with [`ELLIPSIS`]
/// and is exactly `max_length` characters long.
pub fn truncate_body(body: &str, max_length: usize) -> String {
    if body.chars().count() <= max_length {
        return body.to_string();
    }
    if max_length == 0 {
        return String::new();
    }
    let mut out: String = body.chars().take(max_length - 1).collect();
    out.push(ELLIPSIS);
    out
}

/// Drop replacement characters left by lossy decoding and NULs.
pub fn clean_text(text: &str) -> String {
    text.chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER && c != '\0')
        .collect()
}
