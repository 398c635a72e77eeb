// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the feedstr record log.
//!
//! WAL-mode SQLite behind a single `tokio-rusqlite` background thread, with
//! embedded migrations and a [`RecordLog`](feedstr_core::RecordLog)
//! implementation that preserves arrival order for timestamp ties.

pub mod database;
pub mod log;
pub mod migrations;

pub use database::Database;
pub use log::SqliteRecordLog;
