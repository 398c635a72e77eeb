// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket connections to the bootstrap peers.
//!
//! Each operation opens short-lived connections: a subscription that is read
//! until end-of-stored-records, or a single publication awaiting its
//! acknowledgement.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use feedstr_core::{Filter, FeedstrError, PeerNetwork, Record};

static SUBSCRIPTION_SEQ: AtomicU64 = AtomicU64::new(0);

/// A message sent by a peer.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayMessage {
    Event {
        subscription: String,
        record: Box<Record>,
    },
    /// End of stored records for a subscription.
    Eose(String),
    /// Acknowledgement of a publication.
    Ok {
        id: String,
        accepted: bool,
        message: String,
    },
    Closed {
        subscription: String,
        message: String,
    },
    Notice(String),
}

impl RelayMessage {
    /// Parse a peer frame. Unknown or malformed frames yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let frame: Vec<Value> = serde_json::from_str(text).ok()?;
        let label = frame.first()?.as_str()?;
        let string_at = |i: usize| frame.get(i).and_then(Value::as_str).map(str::to_string);
        match label {
            "EVENT" => {
                let record: Record = serde_json::from_value(frame.get(2)?.clone()).ok()?;
                Some(Self::Event {
                    subscription: string_at(1)?,
                    record: Box::new(record),
                })
            }
            "EOSE" => Some(Self::Eose(string_at(1)?)),
            "OK" => Some(Self::Ok {
                id: string_at(1)?,
                accepted: frame.get(2)?.as_bool()?,
                message: string_at(3).unwrap_or_default(),
            }),
            "CLOSED" => Some(Self::Closed {
                subscription: string_at(1)?,
                message: string_at(2).unwrap_or_default(),
            }),
            "NOTICE" => Some(Self::Notice(string_at(1).unwrap_or_default())),
            _ => None,
        }
    }
}

pub fn req_frame(subscription: &str, filter: &Filter) -> String {
    json!(["REQ", subscription, filter.to_json()]).to_string()
}

pub fn close_frame(subscription: &str) -> String {
    json!(["CLOSE", subscription]).to_string()
}

pub fn event_frame(record: &Record) -> String {
    json!(["EVENT", record]).to_string()
}

fn peer_err(peer: &str, message: impl std::fmt::Display) -> FeedstrError {
    FeedstrError::Peer {
        message: format!("{peer}: {message}"),
    }
}

/// The configured bootstrap peers.
#[derive(Debug, Clone)]
pub struct RelayPool {
    peers: Vec<String>,
    publish_timeout: Duration,
}

impl RelayPool {
    pub fn new(peers: Vec<String>, publish_timeout: Duration) -> Self {
        Self {
            peers,
            publish_timeout,
        }
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }
}

/// Collect stored records for `filter` from one peer.
async fn query_peer(peer: &str, filter: &Filter) -> Result<Vec<Record>, FeedstrError> {
    let subscription = format!(
        "feedstr-{}",
        SUBSCRIPTION_SEQ.fetch_add(1, Ordering::Relaxed)
    );
    let (ws, _) = connect_async(peer).await.map_err(|e| peer_err(peer, e))?;
    let (mut write, mut read) = ws.split();
    write
        .send(Message::Text(req_frame(&subscription, filter).into()))
        .await
        .map_err(|e| peer_err(peer, e))?;

    let mut records = Vec::new();
    while let Some(frame) = read.next().await {
        let text = match frame.map_err(|e| peer_err(peer, e))? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        match RelayMessage::parse(text.as_str()) {
            Some(RelayMessage::Event {
                subscription: sub,
                record,
            }) if sub == subscription => {
                if filter.matches(&record) {
                    records.push(*record);
                }
            }
            Some(RelayMessage::Eose(sub)) if sub == subscription => break,
            Some(RelayMessage::Closed { message, .. }) => {
                debug!(peer, message = %message, "subscription closed by peer");
                break;
            }
            Some(RelayMessage::Notice(message)) => debug!(peer, message = %message, "peer notice"),
            _ => {}
        }
    }

    let _ = write
        .send(Message::Text(close_frame(&subscription).into()))
        .await;
    let _ = write.close().await;
    Ok(records)
}

/// Publish one record to one peer and wait for its verdict.
async fn publish_to(peer: &str, record: &Record) -> Result<bool, FeedstrError> {
    let (ws, _) = connect_async(peer).await.map_err(|e| peer_err(peer, e))?;
    let (mut write, mut read) = ws.split();
    write
        .send(Message::Text(event_frame(record).into()))
        .await
        .map_err(|e| peer_err(peer, e))?;

    let mut accepted = false;
    while let Some(frame) = read.next().await {
        let text = match frame.map_err(|e| peer_err(peer, e))? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        if let Some(RelayMessage::Ok {
            id,
            accepted: ok,
            message,
        }) = RelayMessage::parse(text.as_str())
        {
            if id == record.id {
                if !ok {
                    warn!(peer, message = %message, "peer rejected record");
                }
                accepted = ok;
                break;
            }
        }
    }
    let _ = write.close().await;
    Ok(accepted)
}

#[async_trait]
impl PeerNetwork for RelayPool {
    async fn fetch_latest(
        &self,
        filter: &Filter,
        timeout: Duration,
    ) -> Result<Option<Record>, FeedstrError> {
        let lookups = self.peers.iter().map(|peer| async move {
            match tokio::time::timeout(timeout, query_peer(peer, filter)).await {
                Ok(Ok(records)) => records,
                Ok(Err(e)) => {
                    warn!(error = %e, "peer lookup failed");
                    Vec::new()
                }
                Err(_) => {
                    debug!(peer = %peer, "peer lookup timed out");
                    Vec::new()
                }
            }
        });
        let newest = join_all(lookups)
            .await
            .into_iter()
            .flatten()
            .max_by_key(|r| r.created_at);
        Ok(newest)
    }

    async fn publish(&self, record: &Record) -> usize {
        let sends = self.peers.iter().map(|peer| async move {
            match tokio::time::timeout(self.publish_timeout, publish_to(peer, record)).await {
                Ok(Ok(accepted)) => accepted,
                Ok(Err(e)) => {
                    warn!(error = %e, "publication failed");
                    false
                }
                Err(_) => {
                    warn!(peer = %peer, "publication timed out");
                    false
                }
            }
        });
        let accepted = join_all(sends).await.into_iter().filter(|ok| *ok).count();
        debug!(id = %record.id, accepted, peers = self.peers.len(), "record fanned out");
        accepted
    }
}
