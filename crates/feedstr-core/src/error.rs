// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for feedstr.

use thiserror::Error;

/// The error type used across feedstr collaborators and engine operations.
#[derive(Debug, Error)]
pub enum FeedstrError {
    /// Configuration errors (missing secrets, malformed keys in config).
    #[error("configuration error: {0}")]
    Config(String),

    /// User input rejected before any state was touched.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Key material could not be derived or decoded.
    #[error("identity error: {0}")]
    Identity(String),

    /// A record could not be signed or failed verification.
    #[error("signing error: {0}")]
    Signing(String),

    /// Record log backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A feed or site could not be fetched.
    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// A fetched document could not be parsed as a feed.
    #[error("could not parse feed at {url}: {message}")]
    Parse { url: String, message: String },

    /// Peer network errors (connect, protocol, rejected publication).
    #[error("peer error: {message}")]
    Peer { message: String },

    /// The requested feed or record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The feed is already tracked.
    #[error("already exists: {0}")]
    Duplicate(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The controller has stopped accepting work.
    #[error("service is shutting down")]
    Shutdown,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FeedstrError {
    /// Whether the error was caused by caller input rather than the service.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            FeedstrError::Validation(_) | FeedstrError::Duplicate(_) | FeedstrError::NotFound(_)
        )
    }
}
