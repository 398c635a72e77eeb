// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory record log.

use async_trait::async_trait;
use tokio::sync::Mutex;

use feedstr_core::{Filter, FeedstrError, Record, RecordLog};

#[derive(Default)]
struct Inner {
    next_seq: u64,
    records: Vec<(u64, Record)>,
}

/// A [`RecordLog`] kept in a vector, ordered like the SQLite log.
#[derive(Default)]
pub struct MemoryRecordLog {
    inner: Mutex<Inner>,
}

impl MemoryRecordLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored record, newest first.
    pub async fn all(&self) -> Vec<Record> {
        self.matching(&Filter::new()).await
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn matching(&self, filter: &Filter) -> Vec<Record> {
        ordered(&self.inner.lock().await.records, filter)
            .into_iter()
            .map(|(_, r)| r)
            .collect()
    }
}

fn ordered(records: &[(u64, Record)], filter: &Filter) -> Vec<(u64, Record)> {
    let mut hits: Vec<(u64, Record)> = records
        .iter()
        .filter(|(_, r)| filter.matches(r))
        .cloned()
        .collect();
    hits.sort_by(|(sa, a), (sb, b)| b.created_at.cmp(&a.created_at).then(sb.cmp(sa)));
    if let Some(limit) = filter.limit {
        hits.truncate(limit);
    }
    hits
}

#[async_trait]
impl RecordLog for MemoryRecordLog {
    async fn save(&self, record: &Record) -> Result<(), FeedstrError> {
        let mut inner = self.inner.lock().await;
        if inner.records.iter().any(|(_, r)| r.id == record.id) {
            return Ok(());
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.records.push((seq, record.clone()));
        Ok(())
    }

    async fn query(&self, filter: &Filter) -> Result<Vec<Record>, FeedstrError> {
        Ok(self.matching(filter).await)
    }

    async fn delete(&self, filter: &Filter) -> Result<usize, FeedstrError> {
        let mut inner = self.inner.lock().await;
        let doomed: Vec<u64> = ordered(&inner.records, filter)
            .into_iter()
            .map(|(seq, _)| seq)
            .collect();
        inner.records.retain(|(seq, _)| !doomed.contains(seq));
        Ok(doomed.len())
    }
}
