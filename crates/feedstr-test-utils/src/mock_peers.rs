// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Peer network that records what is published.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use feedstr_core::{Filter, FeedstrError, PeerNetwork, Record};

/// Answers lookups from a fixed set of remote records and captures publications.
pub struct MockPeers {
    remote: Mutex<Vec<Record>>,
    published: Mutex<Vec<Record>>,
    peer_count: usize,
    responsive: bool,
}

impl MockPeers {
    /// A network of `peer_count` peers that all accept every record.
    pub fn new(peer_count: usize) -> Self {
        Self {
            remote: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
            peer_count,
            responsive: true,
        }
    }

    /// Peers that take every connection but never acknowledge a publication.
    pub fn unresponsive() -> Self {
        Self {
            responsive: false,
            ..Self::new(1)
        }
    }

    /// Make `record` visible to lookups.
    pub async fn add_remote(&self, record: Record) {
        self.remote.lock().await.push(record);
    }

    pub async fn published(&self) -> Vec<Record> {
        self.published.lock().await.clone()
    }

    pub async fn published_kind(&self, kind: u32) -> Vec<Record> {
        self.published
            .lock()
            .await
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }
}

impl Default for MockPeers {
    fn default() -> Self {
        Self::new(1)
    }
}

#[async_trait]
impl PeerNetwork for MockPeers {
    async fn fetch_latest(
        &self,
        filter: &Filter,
        _timeout: Duration,
    ) -> Result<Option<Record>, FeedstrError> {
        Ok(self
            .remote
            .lock()
            .await
            .iter()
            .filter(|r| filter.matches(r))
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn publish(&self, record: &Record) -> usize {
        if !self.responsive {
            std::future::pending::<()>().await;
        }
        self.published.lock().await.push(record.clone());
        self.peer_count
    }
}
