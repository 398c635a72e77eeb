// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feed registration, bulk import and export.
//!
//! Registration is split in two: [`Registrar::prepare`] does the network
//! work and may run anywhere, [`Registrar::commit`] publishes and appends
//! and must only run on the controller task.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use feedstr_content::{ContentPipeline, ProfileMetadata};
use feedstr_core::{
    kinds, FeedEntity, FeedSource, FeedstrError, Filter, Icon, ParsedFeed, SiteProbe, Timestamp,
};
use feedstr_identity::{derive_identity, FeedKeypair};

use crate::driver::{publish_items, source_times};
use crate::entity_store::EntityStore;
use crate::publisher::Publisher;
use crate::scheduler::Cadence;

const PROFILE_SUFFIX: &str = " (RSS Feed)";

/// One line of an import or export list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEntry {
    #[serde(default)]
    pub title: String,
    pub url: String,
}

/// Per-entry result of an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub url: String,
    pub title: String,
    /// `None` when the feed is now tracked.
    pub error: Option<String>,
}

/// A feed that has been discovered, fetched and keyed, but not yet tracked.
pub struct PreparedFeed {
    pub feed_url: String,
    pub keypair: FeedKeypair,
    pub feed: ParsedFeed,
    pub icon: Option<Icon>,
}

impl std::fmt::Debug for PreparedFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedFeed")
            .field("feed_url", &self.feed_url)
            .field("pubkey", &self.keypair.public_hex())
            .field("items", &self.feed.items.len())
            .field("icon", &self.icon.as_ref().map(|i| &i.url))
            .finish()
    }
}

/// Accept only absolute http(s) URLs with a host.
pub fn validate_url(input: &str) -> Result<String, FeedstrError> {
    let trimmed = input.trim();
    let url = Url::parse(trimmed)
        .map_err(|e| FeedstrError::Validation(format!("invalid URL {trimmed:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(FeedstrError::Validation(format!(
            "unsupported URL scheme {:?}",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(FeedstrError::Validation(format!("URL {trimmed:?} has no host")));
    }
    Ok(trimmed.to_string())
}

#[derive(Clone)]
pub struct Registrar {
    store: EntityStore,
    source: Arc<dyn FeedSource>,
    probe: Arc<dyn SiteProbe>,
    publisher: Publisher,
    pipeline: Arc<ContentPipeline>,
    secret: String,
    cadence: Cadence,
    max_content_length: usize,
}

impl Registrar {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: EntityStore,
        source: Arc<dyn FeedSource>,
        probe: Arc<dyn SiteProbe>,
        publisher: Publisher,
        pipeline: Arc<ContentPipeline>,
        secret: impl Into<String>,
        cadence: Cadence,
        max_content_length: usize,
    ) -> Self {
        Self {
            store,
            source,
            probe,
            publisher,
            pipeline,
            secret: secret.into(),
            cadence,
            max_content_length,
        }
    }

    /// Discover, key and fetch the feed behind `input`.
    pub async fn prepare(&self, input: &str) -> Result<PreparedFeed, FeedstrError> {
        let url = validate_url(input)?;
        let feed_url = self
            .probe
            .discover_feed_url(&url)
            .await
            .ok_or_else(|| FeedstrError::NotFound(format!("no feed found at {url}")))?;
        let keypair = derive_identity(&feed_url, &self.secret)?;
        if self.store.contains(&keypair.public_hex(), &feed_url).await? {
            return Err(FeedstrError::Duplicate(feed_url));
        }
        let feed = self.source.fetch(&feed_url).await?;
        let icon = self.probe.find_icon(&feed.link, &feed_url).await;
        Ok(PreparedFeed {
            feed_url,
            keypair,
            feed,
            icon,
        })
    }

    /// Track a prepared feed.
    pub async fn commit(
        &self,
        prepared: PreparedFeed,
        now: Timestamp,
    ) -> Result<FeedEntity, FeedstrError> {
        if self
            .store
            .contains(&prepared.keypair.public_hex(), &prepared.feed_url)
            .await?
        {
            return Err(FeedstrError::Duplicate(prepared.feed_url));
        }
        let entity = self.publish_initial(&prepared, now).await?;
        self.store.append(std::slice::from_ref(&entity)).await?;
        info!(url = %entity.url, pubkey = %entity.pubkey, "feed registered");
        Ok(entity)
    }

    /// Track every prepared feed of an import with a single aggregate write.
    /// Entries already tracked, or repeated within the batch, are reported
    /// as duplicates.
    pub async fn commit_batch(
        &self,
        batch: Vec<(ImportEntry, Result<PreparedFeed, FeedstrError>)>,
        now: Timestamp,
    ) -> Result<Vec<ImportOutcome>, FeedstrError> {
        let mut outcomes = Vec::with_capacity(batch.len());
        let mut accepted: Vec<FeedEntity> = Vec::new();
        let mut seen = HashSet::new();

        for (entry, prepared) in batch {
            let result = match prepared {
                Ok(prepared) => {
                    let pubkey = prepared.keypair.public_hex();
                    if !seen.insert(pubkey.clone())
                        || self.store.contains(&pubkey, &prepared.feed_url).await?
                    {
                        Err(FeedstrError::Duplicate(prepared.feed_url.clone()))
                    } else {
                        self.publish_initial(&prepared, now).await
                    }
                }
                Err(e) => Err(e),
            };
            let error = match result {
                Ok(entity) => {
                    accepted.push(entity);
                    None
                }
                Err(e) => {
                    warn!(url = %entry.url, error = %e, "import entry rejected");
                    Some(e.to_string())
                }
            };
            outcomes.push(ImportOutcome {
                url: entry.url,
                title: entry.title,
                error,
            });
        }

        self.store.append(&accepted).await?;
        info!(imported = accepted.len(), total = outcomes.len(), "import finished");
        Ok(outcomes)
    }

    /// Tracked feeds as import entries, titled by their latest profile.
    pub async fn export(&self) -> Result<Vec<ImportEntry>, FeedstrError> {
        let mut entries = Vec::new();
        for entity in self.store.list().await? {
            let profile = self
                .publisher
                .log()
                .query(
                    &Filter::new()
                        .author(entity.pubkey.clone())
                        .kind(kinds::PROFILE)
                        .limit(1),
                )
                .await?;
            let title = profile
                .first()
                .and_then(|r| serde_json::from_str::<ProfileMetadata>(&r.content).ok())
                .map(|m| {
                    m.name
                        .strip_suffix(PROFILE_SUFFIX)
                        .unwrap_or(&m.name)
                        .to_string()
                })
                .unwrap_or_else(|| entity.pubkey.clone());
            entries.push(ImportEntry {
                title,
                url: entity.url,
            });
        }
        Ok(entries)
    }

    /// Cache the icon, publish the profile and every current item, and build
    /// the entity to append.
    async fn publish_initial(
        &self,
        prepared: &PreparedFeed,
        now: Timestamp,
    ) -> Result<FeedEntity, FeedstrError> {
        let pubkey = prepared.keypair.public_hex();
        let image_url = match &prepared.icon {
            Some(icon) => {
                if let Err(e) = self.store.assets().store(&pubkey, icon).await {
                    warn!(url = %prepared.feed_url, error = %e, "icon not cached");
                }
                Some(icon.url.clone())
            }
            None => None,
        };

        let profile = self.pipeline.feed_to_profile_record(
            &pubkey,
            &prepared.feed_url,
            &prepared.feed,
            image_url.as_deref(),
            now,
        );
        self.publisher
            .publish_profile(&prepared.keypair, profile)
            .await?;

        let mut entity = FeedEntity {
            pubkey,
            private_key: prepared.keypair.private_hex(),
            url: prepared.feed_url.clone(),
            image_url,
            last_post_time: 0,
            last_checked_time: now,
            avg_post_interval: 0,
        };
        publish_items(
            &self.publisher,
            &self.pipeline,
            self.max_content_length,
            &prepared.keypair,
            &entity,
            &prepared.feed,
            Timestamp::MIN,
            now,
        )
        .await?;

        let times = source_times(&prepared.feed);
        entity.last_post_time = times.iter().copied().max().unwrap_or(0);
        entity.avg_post_interval = self.cadence.recompute_cadence(&times);
        Ok(entity)
    }
}
