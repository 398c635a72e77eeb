// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote peers of the event log.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FeedstrError;
use crate::types::{Filter, Record};

/// The set of bootstrap peers records are read from and fanned out to.
#[async_trait]
pub trait PeerNetwork: Send + Sync {
    /// Newest record matching `filter` across all peers, waiting at most
    /// `timeout`. `Ok(None)` when no peer answers with a match in time.
    async fn fetch_latest(
        &self,
        filter: &Filter,
        timeout: Duration,
    ) -> Result<Option<Record>, FeedstrError>;

    /// Best-effort fan-out. Returns the number of peers that accepted the record.
    async fn publish(&self, record: &Record) -> usize;
}
