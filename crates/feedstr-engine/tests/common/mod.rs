// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine wired to in-memory collaborators.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use feedstr_config::FeedstrConfig;
use feedstr_core::{kinds, unix_now, Filter, Record, RecordLog};
use feedstr_engine::{Collaborators, Controller, ControllerHandle, EngineSettings};
use feedstr_test_utils::fixtures::{SERVICE_PRIVATE_KEY, TEST_SECRET};
use feedstr_test_utils::{MemoryRecordLog, MockFeedSource, MockPeers};

/// Twelve hours and change: every feed with default cadence is due again.
pub const LATER: i64 = 13 * 3600;

pub struct Harness {
    pub log: Arc<MemoryRecordLog>,
    pub source: Arc<MockFeedSource>,
    pub peers: Arc<MockPeers>,
    pub handle: ControllerHandle,
    pub cancel: CancellationToken,
    pub dir: TempDir,
}

pub fn config(dir: &TempDir) -> FeedstrConfig {
    let mut config = FeedstrConfig::default();
    config.service.private_key = Some(SERVICE_PRIVATE_KEY.to_string());
    config.service.secret = Some(TEST_SECRET.to_string());
    config.storage.asset_dir = dir.path().join("assets").display().to_string();
    config
}

pub async fn start() -> Harness {
    start_with(|_| {}).await
}

pub async fn start_with(configure: impl FnOnce(&mut FeedstrConfig)) -> Harness {
    start_with_peers(MockPeers::default(), configure).await
}

pub async fn start_with_peers(
    peers: MockPeers,
    configure: impl FnOnce(&mut FeedstrConfig),
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&dir);
    configure(&mut config);
    let settings = EngineSettings::from_config(&config).unwrap();

    let log = Arc::new(MemoryRecordLog::new());
    let source = Arc::new(MockFeedSource::new());
    let peers = Arc::new(peers);
    let (controller, handle) = Controller::new(
        settings,
        Collaborators {
            log: log.clone(),
            source: source.clone(),
            probe: source.clone(),
            peers: peers.clone(),
        },
    );
    let cancel = CancellationToken::new();
    tokio::spawn(controller.run(cancel.clone()));

    Harness {
        log,
        source,
        peers,
        handle,
        cancel,
        dir,
    }
}

impl Harness {
    pub async fn authored(&self, pubkey: &str, kind: u32) -> Vec<Record> {
        self.log
            .query(&Filter::new().author(pubkey).kind(kind))
            .await
            .unwrap()
    }

    /// Newest follow list of the service identity, as identities.
    pub async fn follow_list(&self) -> Option<Vec<String>> {
        let lists = self
            .authored(self.handle.service_pubkey(), kinds::FOLLOW_LIST)
            .await;
        lists.first().map(|r| {
            r.tags
                .iter()
                .filter(|t| t.key() == Some("p"))
                .filter_map(|t| t.value().map(str::to_string))
                .collect()
        })
    }

    /// Poll until `done` holds or a second has passed.
    pub async fn eventually<F, Fut>(&self, mut done: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..100 {
            if done().await {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Wait until the peers hold exactly `count` records of `kind`.
    pub async fn delivered(&self, kind: u32, count: usize) -> bool {
        let peers = self.peers.clone();
        self.eventually(|| {
            let peers = peers.clone();
            async move { peers.published_kind(kind).await.len() == count }
        })
        .await
    }

    pub fn later(&self) -> i64 {
        unix_now() + LATER
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
