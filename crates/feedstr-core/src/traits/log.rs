// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only record log.

use async_trait::async_trait;

use crate::error::FeedstrError;
use crate::types::{Filter, Record};

/// Local persistent store of signed records.
///
/// `query` returns matches newest first by `created_at`; records with equal
/// timestamps are ordered by most recently stored first. `limit` caps the
/// number of results after ordering.
#[async_trait]
pub trait RecordLog: Send + Sync {
    /// Store a record. Saving a record whose id is already present is a no-op.
    async fn save(&self, record: &Record) -> Result<(), FeedstrError>;

    /// Return records matching the filter.
    async fn query(&self, filter: &Filter) -> Result<Vec<Record>, FeedstrError>;

    /// Delete records matching the filter and return how many were removed.
    ///
    /// `limit` applies to the newest-first ordering used by `query`.
    async fn delete(&self, filter: &Filter) -> Result<usize, FeedstrError>;
}
