// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-identity icon cache on disk.
//!
//! Files are named `<pubkey>.<ext>` so deletion can find them by identity.

use std::path::{Path, PathBuf};

use feedstr_core::{FeedstrError, Icon};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct AssetCache {
    dir: PathBuf,
}

fn io_err(e: std::io::Error) -> FeedstrError {
    FeedstrError::Storage {
        source: Box::new(e),
    }
}

impl AssetCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `icon` for `pubkey`, replacing any previous icon.
    pub async fn store(&self, pubkey: &str, icon: &Icon) -> Result<PathBuf, FeedstrError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;
        self.remove(pubkey).await?;
        let path = self.dir.join(format!("{pubkey}.{}", icon.extension()));
        tokio::fs::write(&path, &icon.bytes).await.map_err(io_err)?;
        debug!(path = %path.display(), "icon cached");
        Ok(path)
    }

    /// Remove every cached file of `pubkey`. Returns how many were removed.
    pub async fn remove(&self, pubkey: &str) -> Result<usize, FeedstrError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(io_err(e)),
        };
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some(pubkey) {
                tokio::fs::remove_file(&path).await.map_err(io_err)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
