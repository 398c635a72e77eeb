// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for feedstr integration tests.
//!
//! Provides in-memory collaborators for fast, deterministic tests without
//! network access or a database file.
//!
//! # Components
//!
//! - [`MemoryRecordLog`] - record log with the same ordering rules as SQLite
//! - [`MockFeedSource`] - scripted feeds, discovery answers and icons
//! - [`MockPeers`] - peer network that records publications
//! - [`fixtures`] - canned feeds, items and keys

pub mod fixtures;
pub mod memory_log;
pub mod mock_peers;
pub mod mock_source;

pub use memory_log::MemoryRecordLog;
pub use mock_peers::MockPeers;
pub use mock_source::MockFeedSource;
