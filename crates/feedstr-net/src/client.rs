// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared HTTP client.

use std::time::Duration;

use feedstr_config::model::FeedsConfig;
use feedstr_core::FeedstrError;
use tracing::error;

/// Build the client used for feeds, site pages and icons.
///
/// Redirects are capped at `max_redirects`; every request is bounded by
/// `fetch_timeout_secs` unless it sets a tighter timeout itself.
pub fn build_http_client(config: &FeedsConfig) -> Result<reqwest::Client, FeedstrError> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .timeout(Duration::from_secs(config.fetch_timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| {
            error!("failed to build HTTP client: {e}");
            FeedstrError::Config(format!("failed to build HTTP client: {e}"))
        })
}
