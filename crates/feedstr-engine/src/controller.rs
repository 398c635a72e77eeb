// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single writer.
//!
//! One task owns every mutation of the aggregate and the follow list. It
//! serves a queue per request type plus the check and cleanup timers, and
//! finishes each work item before taking the next. Callers talk to it
//! through a cloneable [`ControllerHandle`]; replies come back on oneshot
//! channels.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use feedstr_content::{ContentPipeline, ProfileMetadata};
use feedstr_core::{
    unix_now, FeedEntity, FeedSource, FeedstrError, PeerNetwork, Record, RecordLog, SiteProbe,
    Timestamp,
};
use feedstr_identity::FeedKeypair;

use crate::assets::AssetCache;
use crate::cleanup::Cleaner;
use crate::driver::{FailurePolicy, IngestionDriver, TickReport};
use crate::entity_store::{EntityStore, FeedSummary};
use crate::fanout::FanOut;
use crate::follows::{FollowAction, FollowReconciler};
use crate::publisher::Publisher;
use crate::registry::{ImportEntry, ImportOutcome, PreparedFeed, Registrar};
use crate::settings::EngineSettings;

const QUEUE_CAPACITY: usize = 64;
const MIN_SEARCH_LEN: usize = 5;

type Reply<T> = oneshot::Sender<Result<T, FeedstrError>>;

struct RegisterRequest {
    prepared: PreparedFeed,
    reply: Reply<FeedEntity>,
}

struct ImportRequest {
    batch: Vec<(ImportEntry, Result<PreparedFeed, FeedstrError>)>,
    reply: Reply<Vec<ImportOutcome>>,
}

struct DeleteRequest {
    pubkey: String,
    reply: Option<Reply<bool>>,
}

struct FollowRequest {
    action: FollowAction,
    reply: Option<Reply<Option<Record>>>,
}

struct CheckRequest {
    now: Timestamp,
    reply: Reply<TickReport>,
}

/// External collaborators the engine is wired to.
pub struct Collaborators {
    pub log: Arc<dyn RecordLog>,
    pub source: Arc<dyn FeedSource>,
    pub probe: Arc<dyn SiteProbe>,
    pub peers: Arc<dyn PeerNetwork>,
}

pub struct Controller {
    store: EntityStore,
    driver: IngestionDriver,
    registrar: Registrar,
    follows: FollowReconciler,
    cleaner: Cleaner,
    publisher: Publisher,
    service: FeedKeypair,
    service_profile: ProfileMetadata,
    check_interval: Duration,
    cleanup_interval: Duration,
    register_rx: mpsc::Receiver<RegisterRequest>,
    import_rx: mpsc::Receiver<ImportRequest>,
    delete_rx: mpsc::Receiver<DeleteRequest>,
    follow_rx: mpsc::Receiver<FollowRequest>,
    check_rx: mpsc::Receiver<CheckRequest>,
    delete_tx: mpsc::Sender<DeleteRequest>,
}

/// Cloneable entry point for the gateway and the binary.
#[derive(Clone)]
pub struct ControllerHandle {
    store: EntityStore,
    registrar: Registrar,
    service_pubkey: String,
    max_concurrent_fetches: usize,
    register_tx: mpsc::Sender<RegisterRequest>,
    import_tx: mpsc::Sender<ImportRequest>,
    delete_tx: mpsc::Sender<DeleteRequest>,
    follow_tx: mpsc::Sender<FollowRequest>,
    check_tx: mpsc::Sender<CheckRequest>,
}

impl Controller {
    /// Build the controller and its handle. Spawns the peer fan-out task, so
    /// this must run inside a Tokio runtime.
    pub fn new(settings: EngineSettings, collaborators: Collaborators) -> (Self, ControllerHandle) {
        let Collaborators {
            log,
            source,
            probe,
            peers,
        } = collaborators;

        let pipeline = Arc::new(ContentPipeline::from_config(
            &settings.content,
            settings.default_picture_url.clone(),
        ));
        let store = EntityStore::new(
            log.clone(),
            settings.service.clone(),
            settings.tag_key.clone(),
            AssetCache::new(settings.asset_dir.clone()),
        );
        let fanout = FanOut::spawn(peers.clone());
        let publisher = Publisher::new(log.clone(), fanout.clone(), settings.metadata_refresh_secs);
        let driver = IngestionDriver::new(
            store.clone(),
            source.clone(),
            publisher.clone(),
            pipeline.clone(),
            settings.cadence,
            settings.max_content_length,
            settings.max_concurrent_fetches,
            FailurePolicy {
                delete_failing_feeds: settings.delete_failing_feeds,
                max_consecutive_failures: settings.max_consecutive_failures,
            },
        );
        let registrar = Registrar::new(
            store.clone(),
            source,
            probe,
            publisher.clone(),
            pipeline,
            settings.secret.clone(),
            settings.cadence,
            settings.max_content_length,
        );
        let follows = FollowReconciler::new(
            log.clone(),
            peers,
            fanout,
            settings.service.clone(),
            settings.delete_source,
            settings.remote_lookup_timeout,
        );
        let cleaner = Cleaner::new(
            log,
            store.clone(),
            settings.max_note_age_days,
            settings.max_aggregate_age_hours,
        );

        let (register_tx, register_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (import_tx, import_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (delete_tx, delete_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (follow_tx, follow_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (check_tx, check_rx) = mpsc::channel(QUEUE_CAPACITY);

        let handle = ControllerHandle {
            store: store.clone(),
            registrar: registrar.clone(),
            service_pubkey: settings.service.public_hex(),
            max_concurrent_fetches: settings.max_concurrent_fetches,
            register_tx,
            import_tx,
            delete_tx: delete_tx.clone(),
            follow_tx,
            check_tx,
        };
        let controller = Self {
            store,
            driver,
            registrar,
            follows,
            cleaner,
            publisher,
            service: settings.service,
            service_profile: settings.service_profile,
            check_interval: settings.check_interval.max(Duration::from_secs(1)),
            cleanup_interval: settings.cleanup_interval.max(Duration::from_secs(1)),
            register_rx,
            import_rx,
            delete_rx,
            follow_rx,
            check_rx,
            delete_tx,
        };
        (controller, handle)
    }

    /// Publish the service's own profile, subject to the refresh window.
    pub async fn publish_service_profile(&self, now: Timestamp) -> Result<(), FeedstrError> {
        self.publisher
            .publish_service_profile(&self.service, &self.service_profile, now)
            .await?;
        Ok(())
    }

    /// Serve requests and timers until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut checks = tokio::time::interval(self.check_interval);
        checks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        checks.tick().await;
        let mut cleanups = tokio::time::interval(self.cleanup_interval);
        cleanups.set_missed_tick_behavior(MissedTickBehavior::Delay);
        cleanups.tick().await;

        info!(
            check_interval_secs = self.check_interval.as_secs(),
            cleanup_interval_secs = self.cleanup_interval.as_secs(),
            "controller running"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping controller");
                    break;
                }
                _ = checks.tick() => {
                    if let Err(e) = self.tick(unix_now()).await {
                        error!(error = %e, "feed check failed");
                    }
                }
                _ = cleanups.tick() => self.cleanup(unix_now()).await,
                Some(req) = self.register_rx.recv() => {
                    let result = self.registrar.commit(req.prepared, unix_now()).await;
                    if result.is_ok() {
                        self.follow(FollowAction::Sync).await;
                    }
                    let _ = req.reply.send(result);
                }
                Some(req) = self.import_rx.recv() => {
                    let result = self.registrar.commit_batch(req.batch, unix_now()).await;
                    if result.as_ref().is_ok_and(|outcomes| outcomes.iter().any(|o| o.error.is_none())) {
                        self.follow(FollowAction::Sync).await;
                    }
                    let _ = req.reply.send(result);
                }
                Some(req) = self.delete_rx.recv() => {
                    let result = self.delete(&req.pubkey).await;
                    if let Some(reply) = req.reply {
                        let _ = reply.send(result);
                    } else if let Err(e) = result {
                        warn!(pubkey = %req.pubkey, error = %e, "queued deletion failed");
                    }
                }
                Some(req) = self.follow_rx.recv() => {
                    let result = self.apply_follow(req.action).await;
                    if let Some(reply) = req.reply {
                        let _ = reply.send(result);
                    }
                }
                Some(req) = self.check_rx.recv() => {
                    let _ = req.reply.send(self.tick(req.now).await);
                }
            }
        }
        info!("controller stopped");
    }

    /// One feed-check pass, followed by aggregate pruning and queued
    /// deletion of feeds that kept failing.
    pub async fn tick(&mut self, now: Timestamp) -> Result<TickReport, FeedstrError> {
        let report = self.driver.check_all(now).await?;
        if report.checked > 0 {
            if let Err(e) = self.cleaner.prune_aggregates(now).await {
                warn!(error = %e, "aggregate pruning failed");
            }
        }
        for pubkey in &report.doomed {
            warn!(pubkey = %pubkey, "feed kept failing, scheduling deletion");
            let request = DeleteRequest {
                pubkey: pubkey.clone(),
                reply: None,
            };
            if self.delete_tx.try_send(request).is_err() {
                warn!(pubkey = %pubkey, "deletion queue full, retrying on a later failure");
            }
        }
        Ok(report)
    }

    pub async fn cleanup(&self, now: Timestamp) {
        if let Err(e) = self.cleaner.purge_old_notes(now).await {
            warn!(error = %e, "item cleanup failed");
        }
        if let Err(e) = self.cleaner.prune_aggregates(now).await {
            warn!(error = %e, "aggregate cleanup failed");
        }
    }

    async fn delete(&self, pubkey: &str) -> Result<bool, FeedstrError> {
        let deleted = self.store.delete(pubkey).await?;
        if deleted {
            self.follow(FollowAction::Delete(pubkey.to_string())).await;
        } else {
            debug!(pubkey, "deletion requested for untracked feed");
        }
        Ok(deleted)
    }

    async fn apply_follow(&self, action: FollowAction) -> Result<Option<Record>, FeedstrError> {
        let tracked = self.store.list().await?;
        self.follows.apply(action, &tracked).await
    }

    /// Follow-list updates that ride along other work only log failures.
    async fn follow(&self, action: FollowAction) {
        if let Err(e) = self.apply_follow(action).await {
            warn!(error = %e, "follow list update failed");
        }
    }
}

impl ControllerHandle {
    pub fn service_pubkey(&self) -> &str {
        &self.service_pubkey
    }

    /// Register the feed behind `url`. Discovery and fetching happen on the
    /// caller's task; only the final commit is queued.
    pub async fn register(&self, url: &str) -> Result<FeedEntity, FeedstrError> {
        let prepared = self.registrar.prepare(url).await?;
        let (reply, rx) = oneshot::channel();
        self.register_tx
            .send(RegisterRequest { prepared, reply })
            .await
            .map_err(|_| FeedstrError::Shutdown)?;
        rx.await.map_err(|_| FeedstrError::Shutdown)?
    }

    /// Register many feeds, reporting a result per entry.
    pub async fn import(&self, entries: Vec<ImportEntry>) -> Result<Vec<ImportOutcome>, FeedstrError> {
        let registrar = &self.registrar;
        let batch: Vec<(ImportEntry, Result<PreparedFeed, FeedstrError>)> = stream::iter(entries)
            .map(|entry| async move {
                let prepared = registrar.prepare(&entry.url).await;
                (entry, prepared)
            })
            .buffered(self.max_concurrent_fetches.max(1))
            .collect()
            .await;
        let (reply, rx) = oneshot::channel();
        self.import_tx
            .send(ImportRequest { batch, reply })
            .await
            .map_err(|_| FeedstrError::Shutdown)?;
        rx.await.map_err(|_| FeedstrError::Shutdown)?
    }

    /// Stop tracking a feed. `Ok(false)` when it was not tracked.
    pub async fn delete(&self, pubkey: &str) -> Result<bool, FeedstrError> {
        let (reply, rx) = oneshot::channel();
        self.delete_tx
            .send(DeleteRequest {
                pubkey: pubkey.to_string(),
                reply: Some(reply),
            })
            .await
            .map_err(|_| FeedstrError::Shutdown)?;
        rx.await.map_err(|_| FeedstrError::Shutdown)?
    }

    pub async fn follow(&self, action: FollowAction) -> Result<Option<Record>, FeedstrError> {
        let (reply, rx) = oneshot::channel();
        self.follow_tx
            .send(FollowRequest {
                action,
                reply: Some(reply),
            })
            .await
            .map_err(|_| FeedstrError::Shutdown)?;
        rx.await.map_err(|_| FeedstrError::Shutdown)?
    }

    /// Run a feed check as of `now` instead of waiting for the timer.
    pub async fn check_at(&self, now: Timestamp) -> Result<TickReport, FeedstrError> {
        let (reply, rx) = oneshot::channel();
        self.check_tx
            .send(CheckRequest { now, reply })
            .await
            .map_err(|_| FeedstrError::Shutdown)?;
        rx.await.map_err(|_| FeedstrError::Shutdown)?
    }

    pub async fn list_feeds(&self) -> Result<Vec<FeedSummary>, FeedstrError> {
        Ok(self.store.list().await?.iter().map(FeedSummary::from).collect())
    }

    /// Tracked feeds whose URL contains `query`, ignoring case.
    pub async fn search(&self, query: &str) -> Result<Vec<FeedSummary>, FeedstrError> {
        let query = query.trim().to_lowercase();
        if query.chars().count() < MIN_SEARCH_LEN {
            return Err(FeedstrError::Validation(format!(
                "search query must be at least {MIN_SEARCH_LEN} characters"
            )));
        }
        Ok(self
            .store
            .list()
            .await?
            .iter()
            .filter(|e| e.url.to_lowercase().contains(&query))
            .map(FeedSummary::from)
            .collect())
    }

    pub async fn export(&self) -> Result<Vec<ImportEntry>, FeedstrError> {
        self.registrar.export().await
    }
}
