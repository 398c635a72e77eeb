// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection management with PRAGMA setup, WAL mode and migrations.
//!
//! All access goes through tokio-rusqlite's single background thread.
//! Do NOT open additional connections for writes.

use std::path::Path;

use feedstr_core::FeedstrError;
use tracing::{debug, info};

use crate::migrations::run_migrations;

const PRAGMAS: &str = "PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;";

/// Convert a tokio-rusqlite error into `FeedstrError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> FeedstrError {
    FeedstrError::Storage {
        source: Box::new(e),
    }
}

/// An open, migrated database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` and bring its schema up to date.
    pub async fn open(path: &str) -> Result<Self, FeedstrError> {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| FeedstrError::Storage {
                source: Box::new(e),
            })?;
        }
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| FeedstrError::Storage {
                source: Box::new(e),
            })?;
        let db = Self::prepare(conn).await?;
        info!(path, "record log opened");
        Ok(db)
    }

    /// Open a private in-memory database.
    pub async fn open_in_memory() -> Result<Self, FeedstrError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| FeedstrError::Storage {
                source: Box::new(e),
            })?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: tokio_rusqlite::Connection) -> Result<Self, FeedstrError> {
        let migrated = conn
            .call(|conn| -> Result<Result<(), String>, rusqlite::Error> {
                conn.execute_batch(PRAGMAS)?;
                Ok(run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)?;
        migrated.map_err(|message| FeedstrError::Storage {
            source: message.into(),
        })?;
        debug!("schema up to date");
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), FeedstrError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
