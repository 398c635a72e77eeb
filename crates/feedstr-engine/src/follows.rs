// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The service identity's one-hop follow list.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use feedstr_config::model::FollowSource;
use feedstr_core::{
    kinds, unix_now, FeedEntity, FeedstrError, Filter, PeerNetwork, Record, RecordLog, Tag,
};
use feedstr_identity::{verify_record, FeedKeypair};

use crate::fanout::FanOut;

/// A change requested to the follow list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowAction {
    /// Rebuild the list from the tracked feeds.
    Sync,
    /// Merge the tracked feeds into the newest remote list.
    Add,
    /// Drop one identity.
    Delete(String),
}

/// 64 lowercase hex characters.
pub fn is_valid_identity(pubkey: &str) -> bool {
    pubkey.len() == 64
        && pubkey
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Union of `remote` and `local`, remote order first.
///
/// Every entry is checked for well-formedness before duplicates are
/// considered, so a malformed entry never shadows a valid one.
pub fn reconcile_follows(remote: &[String], local: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    remote
        .iter()
        .chain(local)
        .filter(|pk| is_valid_identity(pk))
        .filter(|pk| seen.insert(pk.as_str()))
        .cloned()
        .collect()
}

/// Identities listed by a follow-list record.
pub fn follow_pubkeys(record: &Record) -> Vec<String> {
    record
        .tags
        .iter()
        .filter(|t| t.key() == Some("p"))
        .filter_map(|t| t.value().map(str::to_string))
        .collect()
}

/// Builds, stores and fans out follow-list records.
#[derive(Clone)]
pub struct FollowReconciler {
    log: Arc<dyn RecordLog>,
    peers: Arc<dyn PeerNetwork>,
    fanout: FanOut,
    service: FeedKeypair,
    delete_source: FollowSource,
    lookup_timeout: Duration,
}

impl FollowReconciler {
    pub fn new(
        log: Arc<dyn RecordLog>,
        peers: Arc<dyn PeerNetwork>,
        fanout: FanOut,
        service: FeedKeypair,
        delete_source: FollowSource,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            log,
            peers,
            fanout,
            service,
            delete_source,
            lookup_timeout,
        }
    }

    /// Apply `action` and return the published list, or `None` when nothing changed.
    pub async fn apply(
        &self,
        action: FollowAction,
        tracked: &[FeedEntity],
    ) -> Result<Option<Record>, FeedstrError> {
        let tracked: Vec<String> = tracked.iter().map(|e| e.pubkey.clone()).collect();
        let list = match action {
            FollowAction::Sync => reconcile_follows(&[], &tracked),
            FollowAction::Add => {
                let remote = self.remote_list().await;
                reconcile_follows(&remote, &tracked)
            }
            FollowAction::Delete(pubkey) => {
                let current = match self.delete_source {
                    FollowSource::Local => self.local_list().await?,
                    FollowSource::Remote => self.remote_list().await,
                };
                if !current.contains(&pubkey) {
                    debug!(pubkey = %pubkey, "identity not followed, nothing to publish");
                    return Ok(None);
                }
                current.into_iter().filter(|pk| *pk != pubkey).collect()
            }
        };
        self.publish(list).await.map(Some)
    }

    async fn local_latest(&self) -> Result<Option<Record>, FeedstrError> {
        let filter = Filter::new()
            .author(self.service.public_hex())
            .kind(kinds::FOLLOW_LIST)
            .limit(1);
        Ok(self.log.query(&filter).await?.into_iter().next())
    }

    async fn local_list(&self) -> Result<Vec<String>, FeedstrError> {
        Ok(self
            .local_latest()
            .await?
            .map(|r| follow_pubkeys(&r))
            .unwrap_or_default())
    }

    /// Newest verified list on the peers; empty when none answers in time.
    async fn remote_list(&self) -> Vec<String> {
        let filter = Filter::new()
            .author(self.service.public_hex())
            .kind(kinds::FOLLOW_LIST)
            .limit(1);
        match self.peers.fetch_latest(&filter, self.lookup_timeout).await {
            Ok(Some(record)) => match verify_record(&record) {
                Ok(()) => follow_pubkeys(&record),
                Err(e) => {
                    warn!(id = %record.id, error = %e, "ignoring unverifiable remote follow list");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "remote follow list lookup failed");
                Vec::new()
            }
        }
    }

    async fn publish(&self, list: Vec<String>) -> Result<Record, FeedstrError> {
        let now = unix_now();
        let created_at = self
            .local_latest()
            .await?
            .map_or(now, |prev| now.max(prev.created_at + 1));
        let tags = list.iter().map(|pk| Tag::new(["p", pk.as_str()])).collect();
        let record = self
            .service
            .sign_record(self.service.unsigned(kinds::FOLLOW_LIST, created_at, tags, ""))?;
        self.log.save(&record).await?;
        self.fanout.submit(&record);
        info!(follows = list.len(), "follow list published");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pk(c: char) -> String {
        c.to_string().repeat(64)
    }

    #[test]
    fn identity_validation() {
        assert!(is_valid_identity(&pk('a')));
        assert!(!is_valid_identity(&pk('A')));
        assert!(!is_valid_identity(&pk('g')));
        assert!(!is_valid_identity("abc"));
    }

    #[test]
    fn remote_first_then_new_local_entries() {
        let remote = vec![pk('1'), pk('2')];
        let local = vec![pk('2'), pk('3')];
        assert_eq!(reconcile_follows(&remote, &local), vec![pk('1'), pk('2'), pk('3')]);
    }

    #[test]
    fn malformed_entries_are_dropped_on_both_sides() {
        let remote = vec!["junk".to_string(), pk('1')];
        let local = vec![pk('1').to_uppercase(), pk('2'), String::new()];
        assert_eq!(reconcile_follows(&remote, &local), vec![pk('1'), pk('2')]);
    }

    proptest! {
        #[test]
        fn reconciled_lists_are_valid_and_unique(
            remote in proptest::collection::vec("[0-9a-f]{64}|[a-z]{0,5}", 0..8),
            local in proptest::collection::vec("[0-9a-f]{64}|[A-F]{64}", 0..8),
        ) {
            let out = reconcile_follows(&remote, &local);
            let unique: HashSet<&String> = out.iter().collect();
            prop_assert_eq!(unique.len(), out.len());
            prop_assert!(out.iter().all(|pk| is_valid_identity(pk)));
            for pk in remote.iter().chain(&local).filter(|pk| is_valid_identity(pk)) {
                prop_assert!(out.contains(pk));
            }
        }
    }
}
