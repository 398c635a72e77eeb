// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for feedstr.
//!
//! Holds the signed record model shared with the event log, the parsed feed
//! model, the tracked-feed entity and the collaborator traits every other
//! crate implements or consumes.

pub mod error;
pub mod feed;
pub mod traits;
pub mod types;

pub use error::FeedstrError;
pub use feed::{FeedEntity, FeedItem, Icon, ParsedFeed};
pub use traits::{FeedSource, PeerNetwork, RecordLog, SiteProbe};
pub use types::{kinds, Filter, Record, Tag, Timestamp, UnsignedRecord};

/// Current Unix time in seconds.
pub fn unix_now() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as Timestamp)
        .unwrap_or_default()
}
