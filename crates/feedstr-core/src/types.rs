// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signed record model shared with the event log and its peers.

use serde::{Deserialize, Serialize};

/// Unix time in seconds.
pub type Timestamp = i64;

/// Record kinds produced or consumed by feedstr.
pub mod kinds {
    /// Profile metadata for an identity.
    pub const PROFILE: u32 = 0;
    /// A single republished feed item.
    pub const TEXT_NOTE: u32 = 1;
    /// One-hop follow list of the service identity.
    pub const FOLLOW_LIST: u32 = 3;
    /// Replaceable aggregate carrying the tracked-feed table.
    pub const AGGREGATE: u32 = 10003;
}

/// A record tag: a key followed by zero or more values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(pub Vec<String>);

impl Tag {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn key(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// First value after the key.
    pub fn value(&self) -> Option<&str> {
        self.0.get(1).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A record before id computation and signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedRecord {
    pub pubkey: String,
    pub created_at: Timestamp,
    pub kind: u32,
    pub tags: Vec<Tag>,
    pub content: String,
}

/// A signed, immutable record as stored in the log and exchanged with peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Lowercase hex SHA-256 of the canonical serialization.
    pub id: String,
    pub pubkey: String,
    pub created_at: Timestamp,
    pub kind: u32,
    pub tags: Vec<Tag>,
    pub content: String,
    /// Hex signature over the id bytes.
    pub sig: String,
}

impl Record {
    /// First value of the first tag with the given key.
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key() == Some(key))
            .and_then(Tag::value)
    }

    /// Strip id and signature, e.g. to recompute them.
    pub fn unsigned(&self) -> UnsignedRecord {
        UnsignedRecord {
            pubkey: self.pubkey.clone(),
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags.clone(),
            content: self.content.clone(),
        }
    }
}

/// Query over the record log.
///
/// Empty lists match everything; all populated conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub ids: Vec<String>,
    pub authors: Vec<String>,
    pub kinds: Vec<u32>,
    /// `(tag key, accepted first values)` pairs.
    pub tags: Vec<(String, Vec<String>)>,
    pub since: Option<Timestamp>,
    pub until: Option<Timestamp>,
    pub limit: Option<usize>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn author(mut self, pubkey: impl Into<String>) -> Self {
        self.authors.push(pubkey.into());
        self
    }

    pub fn kind(mut self, kind: u32) -> Self {
        self.kinds.push(kind);
        self
    }

    pub fn kinds<I: IntoIterator<Item = u32>>(mut self, kinds: I) -> Self {
        self.kinds.extend(kinds);
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.tags.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.tags.push((key, vec![value])),
        }
        self
    }

    pub fn since(mut self, ts: Timestamp) -> Self {
        self.since = Some(ts);
        self
    }

    pub fn until(mut self, ts: Timestamp) -> Self {
        self.until = Some(ts);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `record` satisfies every condition except `limit`.
    pub fn matches(&self, record: &Record) -> bool {
        if !self.ids.is_empty() && !self.ids.contains(&record.id) {
            return false;
        }
        if !self.authors.is_empty() && !self.authors.contains(&record.pubkey) {
            return false;
        }
        if !self.kinds.is_empty() && !self.kinds.contains(&record.kind) {
            return false;
        }
        if self.since.is_some_and(|since| record.created_at < since) {
            return false;
        }
        if self.until.is_some_and(|until| record.created_at > until) {
            return false;
        }
        self.tags.iter().all(|(key, values)| {
            record.tags.iter().any(|t| {
                t.key() == Some(key.as_str())
                    && t.value().is_some_and(|v| values.iter().any(|w| w == v))
            })
        })
    }

    /// Wire representation used in peer subscriptions (`#<key>` for tag conditions).
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        if !self.ids.is_empty() {
            obj.insert("ids".into(), serde_json::json!(self.ids));
        }
        if !self.authors.is_empty() {
            obj.insert("authors".into(), serde_json::json!(self.authors));
        }
        if !self.kinds.is_empty() {
            obj.insert("kinds".into(), serde_json::json!(self.kinds));
        }
        for (key, values) in &self.tags {
            obj.insert(format!("#{key}"), serde_json::json!(values));
        }
        if let Some(since) = self.since {
            obj.insert("since".into(), serde_json::json!(since));
        }
        if let Some(until) = self.until {
            obj.insert("until".into(), serde_json::json!(until));
        }
        if let Some(limit) = self.limit {
            obj.insert("limit".into(), serde_json::json!(limit));
        }
        serde_json::Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: u32, created_at: Timestamp, tags: Vec<Tag>) -> Record {
        Record {
            id: "00".repeat(32),
            pubkey: "ab".repeat(32),
            created_at,
            kind,
            tags,
            content: String::new(),
            sig: String::new(),
        }
    }

    #[test]
    fn tag_serializes_as_plain_array() {
        let tag = Tag::new(["proxy", "https://example.com/feed.xml", "rss"]);
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, r#"["proxy","https://example.com/feed.xml","rss"]"#);
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::new().matches(&record(1, 10, vec![])));
    }

    #[test]
    fn filter_checks_kind_and_time_window() {
        let filter = Filter::new().kind(1).since(5).until(20);
        assert!(filter.matches(&record(1, 10, vec![])));
        assert!(!filter.matches(&record(0, 10, vec![])));
        assert!(!filter.matches(&record(1, 4, vec![])));
        assert!(!filter.matches(&record(1, 21, vec![])));
    }

    #[test]
    fn filter_tag_condition_matches_first_value_only() {
        let filter = Filter::new().tag("proxy", "https://a/feed#1");
        let hit = record(1, 0, vec![Tag::new(["proxy", "https://a/feed#1", "rss"])]);
        let miss = record(1, 0, vec![Tag::new(["proxy", "rss", "https://a/feed#1"])]);
        assert!(filter.matches(&hit));
        assert!(!filter.matches(&miss));
    }

    #[test]
    fn filter_wire_json_prefixes_tag_keys() {
        let json = Filter::new()
            .author("aa")
            .kind(3)
            .tag("p", "bb")
            .limit(1)
            .to_json();
        assert_eq!(json["authors"][0], "aa");
        assert_eq!(json["kinds"][0], 3);
        assert_eq!(json["#p"][0], "bb");
        assert_eq!(json["limit"], 1);
        assert!(json.get("since").is_none());
    }

    #[test]
    fn record_tag_value_returns_first_match() {
        let rec = record(
            1,
            0,
            vec![Tag::new(["e", "x"]), Tag::new(["proxy", "u1"]), Tag::new(["proxy", "u2"])],
        );
        assert_eq!(rec.tag_value("proxy"), Some("u1"));
        assert_eq!(rec.tag_value("missing"), None);
    }
}
