// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits at the edges of the sync engine.
//!
//! Every trait uses `#[async_trait]` so the engine can hold them as
//! `Arc<dyn Trait>` and tests can swap in in-memory doubles.

pub mod log;
pub mod peers;
pub mod source;

pub use log::RecordLog;
pub use peers::PeerNetwork;
pub use source::{FeedSource, SiteProbe};
