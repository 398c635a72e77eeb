// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Network collaborators for feedstr.
//!
//! - [`HttpFeedSource`] downloads and parses RSS, Atom and JSON feeds.
//! - [`HttpSiteProbe`] finds the feed behind a website and its icon.
//! - [`RelayPool`] reads from and fans out to the bootstrap peers.

pub mod client;
pub mod feed;
pub mod probe;
pub mod relay;

pub use client::build_http_client;
pub use feed::{parse_feed, HttpFeedSource};
pub use probe::HttpSiteProbe;
pub use relay::{RelayMessage, RelayPool};
