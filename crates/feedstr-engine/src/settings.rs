// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime settings resolved from configuration.

use std::path::PathBuf;
use std::time::Duration;

use feedstr_config::model::{ContentConfig, FollowSource};
use feedstr_config::FeedstrConfig;
use feedstr_content::ProfileMetadata;
use feedstr_core::FeedstrError;
use feedstr_identity::FeedKeypair;

use crate::scheduler::Cadence;

/// Everything the engine needs from the config, with secrets decoded.
#[derive(Clone)]
pub struct EngineSettings {
    pub service: FeedKeypair,
    pub secret: String,
    pub tag_key: String,
    pub service_profile: ProfileMetadata,
    pub default_picture_url: String,
    pub content: ContentConfig,
    pub max_content_length: usize,
    pub metadata_refresh_secs: i64,
    pub cadence: Cadence,
    pub check_interval: Duration,
    pub max_concurrent_fetches: usize,
    pub delete_failing_feeds: bool,
    pub max_consecutive_failures: u32,
    pub cleanup_interval: Duration,
    pub max_note_age_days: u64,
    pub max_aggregate_age_hours: u64,
    pub delete_source: FollowSource,
    pub remote_lookup_timeout: Duration,
    pub asset_dir: PathBuf,
}

impl EngineSettings {
    /// Resolve settings, failing when the service key or secret is missing or malformed.
    pub fn from_config(config: &FeedstrConfig) -> Result<Self, FeedstrError> {
        let private_key = config
            .service
            .private_key
            .as_deref()
            .ok_or_else(|| FeedstrError::Config("service.private_key is required".into()))?;
        let service = FeedKeypair::from_hex(private_key)
            .map_err(|e| FeedstrError::Config(format!("service.private_key: {e}")))?;
        let secret = config
            .service
            .secret
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| FeedstrError::Config("service.secret is required".into()))?;

        let feeds = &config.feeds;
        Ok(Self {
            service,
            secret,
            tag_key: config.service.tag_key.clone(),
            service_profile: ProfileMetadata {
                name: config.service.name.clone(),
                about: config.service.description.clone(),
                picture: config.service.picture_url.clone(),
            },
            default_picture_url: config.service.default_picture_url.clone(),
            content: config.content.clone(),
            max_content_length: feeds.max_content_length,
            metadata_refresh_secs: days_to_secs(feeds.metadata_refresh_days),
            cadence: Cadence {
                min_samples: feeds.min_samples,
                min_secs: mins_to_secs(feeds.min_cadence_mins),
                max_secs: mins_to_secs(feeds.max_cadence_hours.saturating_mul(60)),
            },
            check_interval: Duration::from_secs(feeds.check_interval_mins.saturating_mul(60)),
            max_concurrent_fetches: feeds.max_concurrent_fetches.max(1),
            delete_failing_feeds: feeds.delete_failing_feeds,
            max_consecutive_failures: feeds.max_consecutive_failures,
            cleanup_interval: Duration::from_secs(
                config.cleanup.interval_hours.saturating_mul(3600),
            ),
            max_note_age_days: config.cleanup.max_note_age_days,
            max_aggregate_age_hours: config.cleanup.max_aggregate_age_hours,
            delete_source: config.follows.delete_source,
            remote_lookup_timeout: Duration::from_secs(config.follows.remote_lookup_timeout_secs),
            asset_dir: PathBuf::from(&config.storage.asset_dir),
        })
    }
}

fn mins_to_secs(mins: u64) -> i64 {
    i64::try_from(mins.saturating_mul(60)).unwrap_or(i64::MAX)
}

fn days_to_secs(days: u64) -> i64 {
    i64::try_from(days.saturating_mul(86_400)).unwrap_or(i64::MAX)
}
