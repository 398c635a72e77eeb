// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Removal of aged item records and superseded aggregates.

use std::sync::Arc;

use tracing::info;

use feedstr_core::{kinds, FeedstrError, Filter, RecordLog, Timestamp};

use crate::entity_store::EntityStore;

const AGGREGATE_BATCH: usize = 10;

#[derive(Clone)]
pub struct Cleaner {
    log: Arc<dyn RecordLog>,
    store: EntityStore,
    max_note_age_days: u64,
    max_aggregate_age_hours: u64,
}

impl Cleaner {
    pub fn new(
        log: Arc<dyn RecordLog>,
        store: EntityStore,
        max_note_age_days: u64,
        max_aggregate_age_hours: u64,
    ) -> Self {
        Self {
            log,
            store,
            max_note_age_days,
            max_aggregate_age_hours,
        }
    }

    /// Delete item records of tracked feeds older than the configured age.
    /// Records by any other author are left alone. Zero disables.
    pub async fn purge_old_notes(&self, now: Timestamp) -> Result<usize, FeedstrError> {
        if self.max_note_age_days == 0 {
            return Ok(0);
        }
        let tracked = self.store.list().await?;
        if tracked.is_empty() {
            return Ok(0);
        }
        let cutoff = now.saturating_sub(age_secs(self.max_note_age_days, 86_400));
        let filter = tracked
            .into_iter()
            .fold(Filter::new(), |f, entity| f.author(entity.pubkey))
            .kind(kinds::TEXT_NOTE)
            .until(cutoff.saturating_sub(1));
        let removed = self.log.delete(&filter).await?;
        if removed > 0 {
            info!(removed, "aged item records purged");
        }
        Ok(removed)
    }

    /// Delete superseded aggregates older than the configured age, never the
    /// authoritative one. Zero disables.
    pub async fn prune_aggregates(&self, now: Timestamp) -> Result<usize, FeedstrError> {
        if self.max_aggregate_age_hours == 0 {
            return Ok(0);
        }
        let Some(current) = self.store.current().await? else {
            return Ok(0);
        };
        let cutoff = now.saturating_sub(age_secs(self.max_aggregate_age_hours, 3600));
        let stale: Vec<String> = self
            .log
            .query(
                &Filter::new()
                    .author(current.pubkey.clone())
                    .kind(kinds::AGGREGATE)
                    .until(cutoff.saturating_sub(1)),
            )
            .await?
            .into_iter()
            .map(|r| r.id)
            .filter(|id| *id != current.id)
            .collect();

        let mut removed = 0;
        for batch in stale.chunks(AGGREGATE_BATCH) {
            removed += self.log.delete(&Filter::new().ids(batch.iter().cloned())).await?;
        }
        if removed > 0 {
            info!(removed, "superseded aggregates pruned");
        }
        Ok(removed)
    }
}

fn age_secs(amount: u64, unit: u64) -> i64 {
    i64::try_from(amount.saturating_mul(unit)).unwrap_or(i64::MAX)
}
