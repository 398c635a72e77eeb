// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signing, local storage and peer fan-out of output records.

use std::sync::Arc;

use tracing::{debug, info};

use feedstr_content::ProfileMetadata;
use feedstr_core::{kinds, FeedstrError, Filter, Record, RecordLog, UnsignedRecord};
use feedstr_identity::FeedKeypair;

use crate::fanout::FanOut;

/// What happened to one item record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Published,
    /// Published, and older records with the same provenance were deleted.
    Replaced,
    /// An identical body is already stored under this provenance.
    Unchanged,
}

#[derive(Clone)]
pub struct Publisher {
    log: Arc<dyn RecordLog>,
    fanout: FanOut,
    refresh_secs: i64,
}

impl Publisher {
    pub fn new(log: Arc<dyn RecordLog>, fanout: FanOut, refresh_secs: i64) -> Self {
        Self {
            log,
            fanout,
            refresh_secs,
        }
    }

    pub fn log(&self) -> &Arc<dyn RecordLog> {
        &self.log
    }

    /// Sign with `keypair`, store, then queue for the peers.
    pub async fn publish(
        &self,
        keypair: &FeedKeypair,
        unsigned: UnsignedRecord,
    ) -> Result<Record, FeedstrError> {
        let record = keypair.sign_record(unsigned)?;
        self.log.save(&record).await?;
        self.fanout.submit(&record);
        debug!(id = %record.id, kind = record.kind, "record stored");
        Ok(record)
    }

    /// Publish a profile unless one younger than the refresh window exists.
    /// Older profiles of the same author are removed once the new one is stored.
    pub async fn publish_profile(
        &self,
        keypair: &FeedKeypair,
        unsigned: UnsignedRecord,
    ) -> Result<Option<Record>, FeedstrError> {
        let existing = self
            .log
            .query(&Filter::new().author(unsigned.pubkey.clone()).kind(kinds::PROFILE))
            .await?;
        if let Some(latest) = existing.first() {
            if unsigned.created_at - latest.created_at < self.refresh_secs {
                debug!(pubkey = %unsigned.pubkey, "profile still fresh");
                return Ok(None);
            }
        }

        let record = self.publish(keypair, unsigned).await?;
        let stale: Vec<&str> = existing
            .iter()
            .map(|r| r.id.as_str())
            .filter(|id| *id != record.id)
            .collect();
        if !stale.is_empty() {
            self.log.delete(&Filter::new().ids(stale)).await?;
        }
        info!(pubkey = %record.pubkey, "profile published");
        Ok(Some(record))
    }

    /// Profile of the service identity itself.
    pub async fn publish_service_profile(
        &self,
        service: &FeedKeypair,
        metadata: &ProfileMetadata,
        now: feedstr_core::Timestamp,
    ) -> Result<Option<Record>, FeedstrError> {
        let content = serde_json::to_string(metadata)
            .map_err(|e| FeedstrError::Internal(format!("profile encoding: {e}")))?;
        self.publish_profile(service, service.unsigned(kinds::PROFILE, now, Vec::new(), content))
            .await
    }

    /// Publish an item record, keeping one current record per provenance.
    ///
    /// Records without a guid fragment in their provenance share the bare
    /// feed URL, so those are only deduplicated by body and never replaced.
    pub async fn publish_item(
        &self,
        keypair: &FeedKeypair,
        unsigned: UnsignedRecord,
    ) -> Result<ItemOutcome, FeedstrError> {
        let provenance = unsigned
            .tags
            .iter()
            .find(|t| t.key() == Some("proxy"))
            .and_then(|t| t.value())
            .map(str::to_string);

        let existing = match &provenance {
            Some(p) => {
                self.log
                    .query(
                        &Filter::new()
                            .author(unsigned.pubkey.clone())
                            .kind(kinds::TEXT_NOTE)
                            .tag("proxy", p.clone()),
                    )
                    .await?
            }
            None => Vec::new(),
        };
        if existing.iter().any(|r| r.content == unsigned.content) {
            return Ok(ItemOutcome::Unchanged);
        }

        let record = self.publish(keypair, unsigned).await?;

        let replaceable = provenance.as_deref().is_some_and(|p| p.contains('#'));
        if replaceable && !existing.is_empty() {
            let ids = existing.iter().map(|r| r.id.as_str());
            let removed = self.log.delete(&Filter::new().ids(ids)).await?;
            debug!(id = %record.id, removed, "superseded item records removed");
            return Ok(ItemOutcome::Replaced);
        }
        Ok(ItemOutcome::Published)
    }
}
