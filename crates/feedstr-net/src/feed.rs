// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feed download and parsing.

use async_trait::async_trait;
use feed_rs::model::{Feed, Link};
use tracing::debug;

use feedstr_core::{FeedItem, FeedSource, FeedstrError, ParsedFeed};

/// [`FeedSource`] over HTTP.
#[derive(Clone)]
pub struct HttpFeedSource {
    client: reqwest::Client,
}

impl HttpFeedSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed, FeedstrError> {
        let fetch_err = |message: String| FeedstrError::Fetch {
            url: url.to_string(),
            message,
        };
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("status {status}")));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        let feed = parse_feed(url, &body)?;
        debug!(url, items = feed.items.len(), "feed fetched");
        Ok(feed)
    }
}

/// Parse an RSS, Atom or JSON feed document.
///
/// Entries keep the id the document gives them. feed-rs would otherwise
/// synthesize one from the link and title, or a random UUID when both are
/// missing, and that id would change the item's provenance between polls.
pub fn parse_feed(url: &str, body: &[u8]) -> Result<ParsedFeed, FeedstrError> {
    let parser = feed_rs::parser::Builder::new()
        .id_generator(|_links, _title, _uri| String::new())
        .build();
    let feed = parser.parse(body).map_err(|e| FeedstrError::Parse {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    let comments = rss_comments(&String::from_utf8_lossy(body));
    Ok(convert(feed, comments))
}

fn convert(feed: Feed, comments: Vec<Option<String>>) -> ParsedFeed {
    // Comment links are matched to entries by position; skip them if the scan disagrees.
    let mut comments = if comments.len() == feed.entries.len() {
        comments
    } else {
        vec![None; feed.entries.len()]
    }
    .into_iter();

    let items = feed
        .entries
        .into_iter()
        .map(|entry| FeedItem {
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            description: entry
                .summary
                .map(|t| t.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default(),
            link: site_link(&entry.links).unwrap_or_default(),
            guid: Some(entry.id).filter(|id| !id.trim().is_empty()),
            published: entry.published.map(|t| t.timestamp()),
            updated: entry.updated.map(|t| t.timestamp()),
            comments: comments.next().flatten(),
        })
        .collect();

    ParsedFeed {
        title: feed.title.map(|t| t.content).unwrap_or_default(),
        description: feed.description.map(|t| t.content).unwrap_or_default(),
        link: site_link(&feed.links).unwrap_or_default(),
        image_url: feed.logo.or(feed.icon).map(|i| i.uri),
        items,
    }
}

/// The `alternate` link, else the first one that is not `self`.
fn site_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| links.iter().find(|l| l.rel.as_deref() != Some("self")))
        .map(|l| l.href.clone())
}

/// `<comments>` of every RSS `<item>`, in document order.
fn rss_comments(xml: &str) -> Vec<Option<String>> {
    let mut found = Vec::new();
    let mut rest = xml;
    while let Some(start) = find_open_tag(rest, "item") {
        let after = &rest[start..];
        let end = after.find("</item>").unwrap_or(after.len());
        let item = &after[..end];
        found.push(element_text(item, "comments"));
        rest = &after[end..];
    }
    found
}

fn find_open_tag(haystack: &str, name: &str) -> Option<usize> {
    let open = format!("<{name}");
    let mut offset = 0;
    while let Some(pos) = haystack[offset..].find(&open) {
        let at = offset + pos;
        let next = haystack[at + open.len()..].chars().next();
        if matches!(next, Some('>' | ' ' | '\t' | '\r' | '\n' | '/')) {
            return Some(at + open.len());
        }
        offset = at + open.len();
    }
    None
}

fn element_text(fragment: &str, name: &str) -> Option<String> {
    let start = find_open_tag(fragment, name)?;
    let body_start = start + fragment[start..].find('>')? + 1;
    let body_len = fragment[body_start..].find(&format!("</{name}>"))?;
    let text = fragment[body_start..body_start + body_len].trim();
    let text = text
        .strip_prefix("<![CDATA[")
        .and_then(|t| t.strip_suffix("]]>"))
        .unwrap_or(text)
        .trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Example Blog</title>
    <link>https://example.com/</link>
    <description>Posts about things</description>
    <image><url>https://example.com/logo.png</url><title>x</title><link>https://example.com/</link></image>
    <item>
      <title>Second</title>
      <link>https://example.com/2</link>
      <guid>post-2</guid>
      <pubDate>Tue, 02 Jan 2024 00:00:00 GMT</pubDate>
      <description><![CDATA[<p>Body two</p>]]></description>
      <comments>https://example.com/2#comments</comments>
    </item>
    <item>
      <title>First</title>
      <link>https://example.com/1</link>
      <guid>post-1</guid>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
      <description>Body one</description>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Site</title>
  <link rel="self" href="https://atom.example/feed.xml"/>
  <link rel="alternate" href="https://atom.example/"/>
  <id>urn:uuid:feed</id>
  <updated>2024-01-03T00:00:00Z</updated>
  <entry>
    <title>Entry</title>
    <link href="https://atom.example/entry"/>
    <id>urn:uuid:entry-1</id>
    <published>2024-01-01T00:00:00Z</published>
    <updated>2024-01-02T00:00:00Z</updated>
    <summary>Summary text</summary>
  </entry>
</feed>"#;

    #[test]
    fn rss_channel_and_items_are_mapped() {
        let feed = parse_feed("https://example.com/feed.xml", RSS.as_bytes()).unwrap();
        assert_eq!(feed.title, "Example Blog");
        assert_eq!(feed.description, "Posts about things");
        assert_eq!(feed.link, "https://example.com/");
        assert_eq!(feed.image_url.as_deref(), Some("https://example.com/logo.png"));
        assert_eq!(feed.items.len(), 2);

        let second = &feed.items[0];
        assert_eq!(second.title, "Second");
        assert_eq!(second.link, "https://example.com/2");
        assert_eq!(second.guid.as_deref(), Some("post-2"));
        assert_eq!(second.published, Some(1_704_153_600));
        assert!(second.description.contains("Body two"));
        assert_eq!(second.comments.as_deref(), Some("https://example.com/2#comments"));
        assert_eq!(feed.items[1].comments, None);
    }

    #[test]
    fn atom_prefers_alternate_link_and_keeps_both_times() {
        let feed = parse_feed("https://atom.example/feed.xml", ATOM.as_bytes()).unwrap();
        assert_eq!(feed.link, "https://atom.example/");
        let entry = &feed.items[0];
        assert_eq!(entry.link, "https://atom.example/entry");
        assert_eq!(entry.published, Some(1_704_067_200));
        assert_eq!(entry.updated, Some(1_704_153_600));
        assert_eq!(entry.source_time(), Some(1_704_153_600));
        assert_eq!(entry.description, "Summary text");
    }

    const UNDATED_WITHOUT_GUID: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Notes</title>
    <link>https://notes.example/</link>
    <description>Untitled thoughts</description>
    <item>
      <description>A thought with no title, link, guid or date</description>
    </item>
    <item>
      <title>Linked</title>
      <link>https://notes.example/linked</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn items_without_guid_get_no_synthesized_id() {
        let url = "https://notes.example/feed.xml";
        let first = parse_feed(url, UNDATED_WITHOUT_GUID.as_bytes()).unwrap();
        let second = parse_feed(url, UNDATED_WITHOUT_GUID.as_bytes()).unwrap();
        assert_eq!(first.items.len(), 2);
        assert!(first.items.iter().all(|i| i.guid.is_none()));
        assert_eq!(first.items, second.items);
        assert_eq!(first.items[0].published, None);
        assert_eq!(first.items[1].link, "https://notes.example/linked");
    }

    #[test]
    fn atom_ids_are_kept() {
        let feed = parse_feed("https://atom.example/feed.xml", ATOM.as_bytes()).unwrap();
        assert_eq!(feed.items[0].guid.as_deref(), Some("urn:uuid:entry-1"));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = parse_feed("https://x/feed", b"<html><body>nope</body></html>").unwrap_err();
        assert!(matches!(err, FeedstrError::Parse { .. }));
    }

    #[test]
    fn comment_scan_ignores_similar_tag_names() {
        let xml = "<items><item><comments><![CDATA[ https://c/1 ]]></comments></item><itemx/></items>";
        assert_eq!(rss_comments(xml), vec![Some("https://c/1".to_string())]);
    }
}
