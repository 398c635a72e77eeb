// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background delivery of stored records to the peers.
//!
//! Records are saved locally by the controller and only then queued here, so
//! a slow or silent peer delays delivery but never the controller.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use feedstr_core::{PeerNetwork, Record};

const QUEUE_CAPACITY: usize = 1024;

/// Records delivered at the same time.
const CONCURRENT_DELIVERIES: usize = 8;

/// Handle to the fan-out queue. Clones share one delivery task.
#[derive(Clone)]
pub struct FanOut {
    tx: mpsc::Sender<Record>,
}

impl FanOut {
    /// Start the delivery task. Must be called inside a Tokio runtime.
    ///
    /// The task drains the queue and exits once every handle is dropped.
    pub fn spawn(peers: Arc<dyn PeerNetwork>) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(deliver(peers, rx));
        Self { tx }
    }

    /// Queue `record` for the peers. It stays local-only when the queue is full.
    pub fn submit(&self, record: &Record) {
        match self.tx.try_send(record.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(r)) => {
                warn!(id = %r.id, kind = r.kind, "fan-out queue full, record kept local");
            }
            Err(TrySendError::Closed(r)) => {
                warn!(id = %r.id, kind = r.kind, "fan-out stopped, record kept local");
            }
        }
    }
}

async fn deliver(peers: Arc<dyn PeerNetwork>, rx: mpsc::Receiver<Record>) {
    let queue = stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|r| (r, rx)) });
    queue
        .for_each_concurrent(CONCURRENT_DELIVERIES, |record| {
            let peers = peers.clone();
            async move {
                let accepted = peers.publish(&record).await;
                debug!(id = %record.id, kind = record.kind, accepted, "record fanned out");
            }
        })
        .await;
    debug!("fan-out task finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use feedstr_core::Tag;
    use feedstr_test_utils::MockPeers;

    fn record(id: &str) -> Record {
        Record {
            id: id.to_string(),
            pubkey: "aa".repeat(32),
            created_at: 1,
            kind: 1,
            tags: vec![Tag::new(["proxy", "u", "rss"])],
            content: String::new(),
            sig: "00".repeat(64),
        }
    }

    #[tokio::test]
    async fn queued_records_reach_the_peers() {
        let peers = Arc::new(MockPeers::default());
        let fanout = FanOut::spawn(peers.clone());
        fanout.submit(&record("a"));
        fanout.submit(&record("b"));

        for _ in 0..100 {
            if peers.published().await.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let mut ids: Vec<String> = peers.published().await.into_iter().map(|r| r.id).collect();
        ids.sort();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn silent_peers_never_block_the_submitter() {
        let fanout = FanOut::spawn(Arc::new(MockPeers::unresponsive()));
        let submitted = tokio::time::timeout(Duration::from_secs(1), async {
            for i in 0..(QUEUE_CAPACITY + CONCURRENT_DELIVERIES + 10) {
                fanout.submit(&record(&i.to_string()));
            }
        })
        .await;
        assert!(submitted.is_ok());
    }
}
