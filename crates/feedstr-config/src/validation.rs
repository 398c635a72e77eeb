// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks the constraints serde cannot express: key formats, positive
//! intervals, ordered cadence bounds and well-formed peer URLs.

use crate::diagnostic::ConfigError;
use crate::model::FeedstrConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every error instead of failing fast. Missing `service.private_key`
/// and `service.secret` are not errors here; `serve` requires them at startup.
pub fn validate_config(config: &FeedstrConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if let Some(key) = &config.service.private_key {
        if key.len() != 64 || !key.chars().all(|c| c.is_ascii_hexdigit()) {
            errors.push(ConfigError::invalid(
                "service.private_key",
                "must be 64 hex characters",
            ));
        }
    }

    if config.service.secret.as_deref().is_some_and(|s| s.is_empty()) {
        errors.push(ConfigError::invalid("service.secret", "must not be empty when set"));
    }

    if config.service.tag_key.trim().is_empty() {
        errors.push(ConfigError::invalid("service.tag_key", "must not be empty"));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::invalid("storage.database_path", "must not be empty"));
    }

    if config.storage.asset_dir.trim().is_empty() {
        errors.push(ConfigError::invalid("storage.asset_dir", "must not be empty"));
    }

    let feeds = &config.feeds;
    for (name, value) in [
        ("feeds.check_interval_mins", feeds.check_interval_mins),
        ("feeds.min_cadence_mins", feeds.min_cadence_mins),
        ("feeds.max_cadence_hours", feeds.max_cadence_hours),
        ("feeds.fetch_timeout_secs", feeds.fetch_timeout_secs),
        ("feeds.icon_timeout_secs", feeds.icon_timeout_secs),
        ("cleanup.interval_hours", config.cleanup.interval_hours),
        ("network.publish_timeout_secs", config.network.publish_timeout_secs),
        (
            "follows.remote_lookup_timeout_secs",
            config.follows.remote_lookup_timeout_secs,
        ),
    ] {
        if value == 0 {
            errors.push(ConfigError::invalid(name, "must be greater than 0"));
        }
    }

    if feeds.min_cadence_mins * 60 > feeds.max_cadence_hours * 3600 {
        errors.push(ConfigError::invalid(
            "feeds.min_cadence_mins",
            format!(
                "({}) exceeds feeds.max_cadence_hours ({})",
                feeds.min_cadence_mins, feeds.max_cadence_hours
            ),
        ));
    }

    // A one-character body cannot hold the ellipsis plus content.
    if feeds.max_content_length < 2 {
        errors.push(ConfigError::invalid(
            "feeds.max_content_length",
            format!("must be at least 2, got {}", feeds.max_content_length),
        ));
    }

    if feeds.max_concurrent_fetches == 0 {
        errors.push(ConfigError::invalid("feeds.max_concurrent_fetches", "must be at least 1"));
    }

    if feeds.delete_failing_feeds && feeds.max_consecutive_failures == 0 {
        errors.push(ConfigError::invalid(
            "feeds.max_consecutive_failures",
            "must be at least 1 when feeds.delete_failing_feeds is enabled",
        ));
    }

    for (i, rule) in config.content.aggregators.iter().enumerate() {
        if rule.domain.trim().is_empty() || !rule.path_prefix.starts_with('/') {
            errors.push(ConfigError::invalid(
                format!("content.aggregators[{i}]"),
                "needs a domain and a path_prefix starting with `/`",
            ));
        }
    }

    for peer in &config.network.bootstrap_peers {
        match url::Url::parse(peer) {
            Ok(parsed) if matches!(parsed.scheme(), "ws" | "wss") => {}
            _ => errors.push(ConfigError::invalid(
                "network.bootstrap_peers",
                format!("entry `{peer}` is not a ws:// or wss:// URL"),
            )),
        }
    }

    if config.gateway.enabled && config.gateway.host.trim().is_empty() {
        errors.push(ConfigError::invalid("gateway.host", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
