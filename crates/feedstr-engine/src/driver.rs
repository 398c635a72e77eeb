// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic feed checks: fetch due feeds, publish what is new, advance
//! watermarks.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use feedstr_content::ContentPipeline;
use feedstr_core::{FeedEntity, FeedSource, FeedstrError, ParsedFeed, Timestamp};
use feedstr_identity::FeedKeypair;

use crate::entity_store::EntityStore;
use crate::publisher::{ItemOutcome, Publisher};
use crate::scheduler::{is_due, Cadence};

/// Summary of one check pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct TickReport {
    pub checked: usize,
    pub published: usize,
    pub failed: usize,
    /// Identities that reached the consecutive-failure limit.
    pub doomed: Vec<String>,
}

/// Failure bookkeeping for the optional deregistration of dead feeds.
#[derive(Debug, Clone, Copy)]
pub struct FailurePolicy {
    pub delete_failing_feeds: bool,
    pub max_consecutive_failures: u32,
}

pub struct IngestionDriver {
    store: EntityStore,
    source: Arc<dyn FeedSource>,
    publisher: Publisher,
    pipeline: Arc<ContentPipeline>,
    cadence: Cadence,
    max_content_length: usize,
    max_concurrent_fetches: usize,
    failure_policy: FailurePolicy,
    failures: HashMap<String, u32>,
}

impl IngestionDriver {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: EntityStore,
        source: Arc<dyn FeedSource>,
        publisher: Publisher,
        pipeline: Arc<ContentPipeline>,
        cadence: Cadence,
        max_content_length: usize,
        max_concurrent_fetches: usize,
        failure_policy: FailurePolicy,
    ) -> Self {
        Self {
            store,
            source,
            publisher,
            pipeline,
            cadence,
            max_content_length,
            max_concurrent_fetches: max_concurrent_fetches.max(1),
            failure_policy,
            failures: HashMap::new(),
        }
    }

    /// Check every due feed. Fetches run concurrently; results are applied
    /// one at a time so aggregate writes never interleave.
    pub async fn check_all(&mut self, now: Timestamp) -> Result<TickReport, FeedstrError> {
        let due: Vec<FeedEntity> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|e| is_due(e, now))
            .collect();
        let mut report = TickReport::default();
        if due.is_empty() {
            return Ok(report);
        }
        debug!(due = due.len(), "checking feeds");

        let source = self.source.clone();
        let fetched: Vec<(FeedEntity, Result<ParsedFeed, FeedstrError>)> = stream::iter(due)
            .map(|entity| {
                let source = source.clone();
                async move {
                    let result = source.fetch(&entity.url).await;
                    (entity, result)
                }
            })
            .buffer_unordered(self.max_concurrent_fetches)
            .collect()
            .await;

        for (entity, result) in fetched {
            report.checked += 1;
            match result {
                Ok(feed) => {
                    self.failures.remove(&entity.pubkey);
                    match self.apply(&entity, &feed, now).await {
                        Ok(published) => report.published += published,
                        Err(e) => {
                            warn!(url = %entity.url, error = %e, "applying feed failed");
                            report.failed += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!(url = %entity.url, error = %e, "feed fetch failed");
                    report.failed += 1;
                    if self.record_failure(&entity.pubkey) {
                        report.doomed.push(entity.pubkey.clone());
                    }
                }
            }
        }

        info!(
            checked = report.checked,
            published = report.published,
            failed = report.failed,
            "feed check complete"
        );
        Ok(report)
    }

    /// Count a failure; `true` once the feed should be deregistered.
    fn record_failure(&mut self, pubkey: &str) -> bool {
        let count = self.failures.entry(pubkey.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        let limit = self.failure_policy.max_consecutive_failures.max(1);
        if self.failure_policy.delete_failing_feeds && *count >= limit {
            self.failures.remove(pubkey);
            return true;
        }
        false
    }

    pub fn consecutive_failures(&self, pubkey: &str) -> u32 {
        self.failures.get(pubkey).copied().unwrap_or(0)
    }

    /// Publish the profile and new items of one fetched feed, then advance
    /// its watermark. Returns how many item records were published.
    async fn apply(
        &self,
        entity: &FeedEntity,
        feed: &ParsedFeed,
        now: Timestamp,
    ) -> Result<usize, FeedstrError> {
        let keypair = FeedKeypair::from_hex(&entity.private_key)?;

        let profile = self.pipeline.feed_to_profile_record(
            &entity.pubkey,
            &entity.url,
            feed,
            entity.image_url.as_deref(),
            now,
        );
        if let Err(e) = self.publisher.publish_profile(&keypair, profile).await {
            warn!(url = %entity.url, error = %e, "profile refresh failed");
        }

        let published = publish_items(
            &self.publisher,
            &self.pipeline,
            self.max_content_length,
            &keypair,
            entity,
            feed,
            entity.last_post_time,
            now,
        )
        .await?;

        let times = source_times(feed);
        let mut updated = entity.clone();
        updated.last_post_time = times
            .iter()
            .copied()
            .max()
            .map_or(entity.last_post_time, |newest| newest.max(entity.last_post_time));
        updated.last_checked_time = now;
        updated.avg_post_interval = self.cadence.recompute_cadence(&times);
        if !self.store.update_watermark(&updated).await? {
            debug!(url = %entity.url, "feed removed during check");
        }
        Ok(published)
    }
}

/// Item timestamps as reported by the source; undated items are left out.
pub fn source_times(feed: &ParsedFeed) -> Vec<Timestamp> {
    feed.items.iter().filter_map(|i| i.source_time()).collect()
}

/// Convert and publish the items of `feed` timestamped after `watermark`.
/// Unsignable items are dropped; their siblings still go out.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn publish_items(
    publisher: &Publisher,
    pipeline: &ContentPipeline,
    max_content_length: usize,
    keypair: &FeedKeypair,
    entity: &FeedEntity,
    feed: &ParsedFeed,
    watermark: Timestamp,
    now: Timestamp,
) -> Result<usize, FeedstrError> {
    let mut published = 0;
    for item in &feed.items {
        let unsigned = pipeline.item_to_record(
            &entity.pubkey,
            &entity.url,
            item,
            feed,
            max_content_length,
            now,
        );
        if unsigned.created_at <= watermark {
            continue;
        }
        match publisher.publish_item(keypair, unsigned).await {
            Ok(ItemOutcome::Published | ItemOutcome::Replaced) => published += 1,
            Ok(ItemOutcome::Unchanged) => {}
            Err(FeedstrError::Signing(message)) => {
                warn!(url = %entity.url, message = %message, "dropping unsignable item");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(published)
}
