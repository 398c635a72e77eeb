// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The tracked-feed table, kept as a single replaceable aggregate record.
//!
//! Every tracked feed is one `[tag_key, <entity json>]` tag of the newest
//! aggregate authored by the service identity. Mutations write a whole new
//! aggregate; older ones linger until cleanup prunes them. Only the
//! controller task calls the mutating methods.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use feedstr_core::{kinds, unix_now, FeedEntity, FeedstrError, Filter, Record, RecordLog, Tag};
use feedstr_identity::FeedKeypair;

use crate::assets::AssetCache;

#[derive(Clone)]
pub struct EntityStore {
    log: Arc<dyn RecordLog>,
    service: FeedKeypair,
    tag_key: String,
    assets: AssetCache,
}

impl EntityStore {
    pub fn new(
        log: Arc<dyn RecordLog>,
        service: FeedKeypair,
        tag_key: impl Into<String>,
        assets: AssetCache,
    ) -> Self {
        Self {
            log,
            service,
            tag_key: tag_key.into(),
            assets,
        }
    }

    pub fn log(&self) -> &Arc<dyn RecordLog> {
        &self.log
    }

    pub fn assets(&self) -> &AssetCache {
        &self.assets
    }

    /// The authoritative aggregate, if one was ever written.
    pub async fn current(&self) -> Result<Option<Record>, FeedstrError> {
        let filter = Filter::new()
            .author(self.service.public_hex())
            .kind(kinds::AGGREGATE)
            .limit(1);
        Ok(self.log.query(&filter).await?.into_iter().next())
    }

    /// All tracked feeds, in aggregate order.
    pub async fn list(&self) -> Result<Vec<FeedEntity>, FeedstrError> {
        let Some(aggregate) = self.current().await? else {
            return Ok(Vec::new());
        };
        Ok(self.decode(&aggregate))
    }

    pub async fn find(&self, pubkey: &str) -> Result<Option<FeedEntity>, FeedstrError> {
        Ok(self.list().await?.into_iter().find(|e| e.pubkey == pubkey))
    }

    pub async fn find_by_url(&self, url: &str) -> Result<Option<FeedEntity>, FeedstrError> {
        Ok(self.list().await?.into_iter().find(|e| e.url == url))
    }

    /// Whether a feed with this identity or this exact URL is tracked.
    pub async fn contains(&self, pubkey: &str, url: &str) -> Result<bool, FeedstrError> {
        Ok(self
            .list()
            .await?
            .iter()
            .any(|e| e.pubkey == pubkey || e.url == url))
    }

    pub async fn append(&self, entities: &[FeedEntity]) -> Result<(), FeedstrError> {
        if entities.is_empty() {
            return Ok(());
        }
        let (previous, mut tags) = self.current_tags().await?;
        for entity in entities {
            tags.push(self.encode(entity)?);
        }
        self.write(previous.as_ref(), tags).await?;
        info!(added = entities.len(), "feeds appended");
        Ok(())
    }

    /// Replace the polling state of a tracked feed. Returns `false` when the
    /// feed is no longer tracked.
    pub async fn update_watermark(&self, entity: &FeedEntity) -> Result<bool, FeedstrError> {
        let (previous, mut tags) = self.current_tags().await?;
        let Some(pos) = tags
            .iter()
            .position(|t| self.decode_tag(t).is_some_and(|e| e.pubkey == entity.pubkey))
        else {
            return Ok(false);
        };
        let tag = tags.remove(pos);
        let Some(mut stored) = self.decode_tag(&tag) else {
            return Ok(false);
        };
        stored.last_post_time = entity.last_post_time;
        stored.last_checked_time = entity.last_checked_time;
        stored.avg_post_interval = entity.avg_post_interval;
        tags.push(self.encode(&stored)?);
        self.write(previous.as_ref(), tags).await?;
        debug!(pubkey = %entity.pubkey, last_post_time = entity.last_post_time, "watermark updated");
        Ok(true)
    }

    /// Stop tracking `pubkey` and purge everything it authored. Returns
    /// `false` when nothing matched.
    pub async fn delete(&self, pubkey: &str) -> Result<bool, FeedstrError> {
        let (previous, mut tags) = self.current_tags().await?;
        let Some(pos) = tags
            .iter()
            .position(|t| self.decode_tag(t).is_some_and(|e| e.pubkey == pubkey))
        else {
            return Ok(false);
        };
        tags.remove(pos);
        self.write(previous.as_ref(), tags).await?;

        let purged = self
            .log
            .delete(
                &Filter::new()
                    .author(pubkey)
                    .kinds([kinds::PROFILE, kinds::TEXT_NOTE]),
            )
            .await?;
        let assets = self.assets.remove(pubkey).await?;
        info!(pubkey, purged, assets, "feed deleted");
        Ok(true)
    }

    async fn current_tags(&self) -> Result<(Option<Record>, Vec<Tag>), FeedstrError> {
        let current = self.current().await?;
        let tags = current
            .as_ref()
            .map(|r| {
                r.tags
                    .iter()
                    .filter(|t| t.key() == Some(self.tag_key.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok((current, tags))
    }

    fn decode(&self, aggregate: &Record) -> Vec<FeedEntity> {
        aggregate
            .tags
            .iter()
            .filter(|t| t.key() == Some(self.tag_key.as_str()))
            .filter_map(|t| {
                let entity = self.decode_tag(t);
                if entity.is_none() {
                    warn!(aggregate = %aggregate.id, "skipping undecodable feed entry");
                }
                entity
            })
            .collect()
    }

    fn decode_tag(&self, tag: &Tag) -> Option<FeedEntity> {
        serde_json::from_str(tag.value()?).ok()
    }

    fn encode(&self, entity: &FeedEntity) -> Result<Tag, FeedstrError> {
        let value = serde_json::to_string(entity).map_err(|e| FeedstrError::Storage {
            source: Box::new(e),
        })?;
        Ok(Tag::new([self.tag_key.clone(), value]))
    }

    /// Sign and store a new aggregate. Its timestamp is strictly newer than
    /// the previous one so the newest-first query always finds it.
    async fn write(&self, previous: Option<&Record>, tags: Vec<Tag>) -> Result<Record, FeedstrError> {
        let now = unix_now();
        let created_at = previous.map_or(now, |p| now.max(p.created_at + 1));
        let content = json!({
            "feedstr": env!("CARGO_PKG_VERSION"),
            "pubkey": "",
            "privkey": "",
            "url": "",
            "last_update": now,
        })
        .to_string();
        let record = self
            .service
            .sign_record(self.service.unsigned(kinds::AGGREGATE, created_at, tags, content))?;
        self.log.save(&record).await?;
        Ok(record)
    }
}

/// Public view of a tracked feed, without key material.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FeedSummary {
    pub pubkey: String,
    pub url: String,
    pub image_url: Option<String>,
    pub last_post_time: feedstr_core::Timestamp,
    pub last_checked_time: feedstr_core::Timestamp,
    pub avg_post_interval: i64,
}

impl From<&FeedEntity> for FeedSummary {
    fn from(entity: &FeedEntity) -> Self {
        Self {
            pubkey: entity.pubkey.clone(),
            url: entity.url.clone(),
            image_url: entity.image_url.clone(),
            last_post_time: entity.last_post_time,
            last_checked_time: entity.last_checked_time,
            avg_post_interval: entity.avg_post_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedstr_test_utils::fixtures::SERVICE_PRIVATE_KEY;
    use feedstr_test_utils::MemoryRecordLog;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn undecodable_entries_are_skipped_with_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(MemoryRecordLog::new());
        let service = FeedKeypair::from_hex(SERVICE_PRIVATE_KEY).unwrap();
        let good = FeedEntity {
            pubkey: "ab".repeat(32),
            private_key: "cd".repeat(32),
            url: "https://example.com/feed.xml".into(),
            image_url: None,
            last_post_time: 1,
            last_checked_time: 2,
            avg_post_interval: 3,
        };
        let encoded = serde_json::to_string(&good).unwrap();
        let aggregate = service
            .sign_record(service.unsigned(
                kinds::AGGREGATE,
                10,
                vec![
                    Tag::new(["feed", "{not json"]),
                    Tag::new(["feed", encoded.as_str()]),
                    Tag::new(["other", "ignored"]),
                ],
                "{}",
            ))
            .unwrap();
        log.save(&aggregate).await.unwrap();

        let store = EntityStore::new(log, service, "feed", AssetCache::new(dir.path()));
        assert_eq!(store.list().await.unwrap(), vec![good]);
        assert!(logs_contain("skipping undecodable feed entry"));
    }
}
