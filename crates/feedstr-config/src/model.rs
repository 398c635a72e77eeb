// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for feedstr.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level feedstr configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values; `service.private_key`
/// and `service.secret` are required before `serve` will start.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FeedstrConfig {
    /// Service identity and presentation.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Record log and asset locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Polling and cadence settings.
    #[serde(default)]
    pub feeds: FeedsConfig,

    /// Content pipeline rules.
    #[serde(default)]
    pub content: ContentConfig,

    /// Stale-record cleanup.
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// Bootstrap peers.
    #[serde(default)]
    pub network: NetworkConfig,

    /// One-hop follow list reconciliation.
    #[serde(default)]
    pub follows: FollowsConfig,

    /// Admin HTTP gateway.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Optional whitelist policy gate.
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Service identity and presentation.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used for the service's own profile and health output.
    #[serde(default = "default_service_name")]
    pub name: String,

    #[serde(default = "default_service_description")]
    pub description: String,

    /// Public URL peers and users reach the service at.
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// Hex-encoded 32-byte private key of the service identity.
    #[serde(default)]
    pub private_key: Option<String>,

    /// Secret keying per-feed identity derivation. Rotating it re-keys every feed.
    #[serde(default)]
    pub secret: Option<String>,

    /// Picture for the service profile.
    #[serde(default = "default_picture_url")]
    pub picture_url: String,

    /// Picture used for feeds without an icon.
    #[serde(default = "default_picture_url")]
    pub default_picture_url: String,

    /// Tag key of entries in the aggregate record.
    #[serde(default = "default_tag_key")]
    pub tag_key: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            description: default_service_description(),
            public_url: default_public_url(),
            private_key: None,
            secret: None,
            picture_url: default_picture_url(),
            default_picture_url: default_picture_url(),
            tag_key: default_tag_key(),
            log_level: default_log_level(),
        }
    }
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("public_url", &self.public_url)
            .field("private_key", &self.private_key.as_ref().map(|_| "[redacted]"))
            .field("secret", &self.secret.as_ref().map(|_| "[redacted]"))
            .field("picture_url", &self.picture_url)
            .field("default_picture_url", &self.default_picture_url)
            .field("tag_key", &self.tag_key)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn default_service_name() -> String {
    "feedstr".to_string()
}

fn default_service_description() -> String {
    "Syndication feeds republished as signed records.".to_string()
}

fn default_public_url() -> String {
    "http://localhost:3334".to_string()
}

fn default_picture_url() -> String {
    "https://cdn.jsdelivr.net/gh/walkxcode/dashboard-icons/png/commafeed.png".to_string()
}

fn default_tag_key() -> String {
    "feedstr".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite record log.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory for cached feed icons.
    #[serde(default = "default_asset_dir")]
    pub asset_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            asset_dir: default_asset_dir(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("feedstr/feedstr.db").display().to_string())
        .unwrap_or_else(|| "feedstr.db".to_string())
}

fn default_asset_dir() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("feedstr/assets").display().to_string())
        .unwrap_or_else(|| "assets".to_string())
}

/// Polling, fetching and cadence settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FeedsConfig {
    /// Minutes between feed-check ticks.
    #[serde(default = "default_check_interval_mins")]
    pub check_interval_mins: u64,

    /// Days a profile record stays fresh before it is rebuilt.
    #[serde(default = "default_metadata_refresh_days")]
    pub metadata_refresh_days: u64,

    /// Maximum characters of an item body before links are appended.
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,

    /// Item timestamps needed before a cadence is learned.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Lower cadence bound in minutes.
    #[serde(default = "default_min_cadence_mins")]
    pub min_cadence_mins: u64,

    /// Upper cadence bound in hours.
    #[serde(default = "default_max_cadence_hours")]
    pub max_cadence_hours: u64,

    /// Per-request timeout for feed and page fetches.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Per-request timeout for icon probes.
    #[serde(default = "default_icon_timeout_secs")]
    pub icon_timeout_secs: u64,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Feeds fetched concurrently within one tick.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Deregister feeds after `max_consecutive_failures` failed polls.
    #[serde(default)]
    pub delete_failing_feeds: bool,

    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            check_interval_mins: default_check_interval_mins(),
            metadata_refresh_days: default_metadata_refresh_days(),
            max_content_length: default_max_content_length(),
            min_samples: default_min_samples(),
            min_cadence_mins: default_min_cadence_mins(),
            max_cadence_hours: default_max_cadence_hours(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            icon_timeout_secs: default_icon_timeout_secs(),
            max_redirects: default_max_redirects(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            delete_failing_feeds: false,
            max_consecutive_failures: default_max_consecutive_failures(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_check_interval_mins() -> u64 {
    30
}

fn default_metadata_refresh_days() -> u64 {
    7
}

fn default_max_content_length() -> usize {
    250
}

fn default_min_samples() -> usize {
    5
}

fn default_min_cadence_mins() -> u64 {
    15
}

fn default_max_cadence_hours() -> u64 {
    12
}

fn default_fetch_timeout_secs() -> u64 {
    5
}

fn default_icon_timeout_secs() -> u64 {
    2
}

fn default_max_redirects() -> usize {
    2
}

fn default_max_concurrent_fetches() -> usize {
    8
}

fn default_max_consecutive_failures() -> u32 {
    5
}

fn default_user_agent() -> String {
    format!("feedstr/{}", env!("CARGO_PKG_VERSION"))
}

/// Rules applied by the content pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContentConfig {
    /// Aggregator sites whose feeds carry a sub-community path segment.
    #[serde(default = "default_aggregators")]
    pub aggregators: Vec<AggregatorRule>,

    /// Sites whose item descriptions repeat the title by convention.
    #[serde(default = "default_title_echo_domains")]
    pub title_echo_domains: Vec<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            aggregators: default_aggregators(),
            title_echo_domains: default_title_echo_domains(),
        }
    }
}

/// A site whose feeds are scoped to a sub-community, e.g. `/r/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AggregatorRule {
    /// Host suffix, matched against the feed's site link.
    pub domain: String,
    /// Path prefix preceding the sub-community name.
    pub path_prefix: String,
}

fn default_aggregators() -> Vec<AggregatorRule> {
    vec![AggregatorRule {
        domain: "reddit.com".to_string(),
        path_prefix: "/r/".to_string(),
    }]
}

fn default_title_echo_domains() -> Vec<String> {
    vec!["stacker.news".to_string(), "reddit.com".to_string()]
}

/// Stale-record cleanup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CleanupConfig {
    #[serde(default = "default_cleanup_interval_hours")]
    pub interval_hours: u64,

    /// Item records older than this are deleted. 0 disables.
    #[serde(default)]
    pub max_note_age_days: u64,

    /// Superseded aggregate records older than this are deleted. 0 disables.
    #[serde(default = "default_max_aggregate_age_hours")]
    pub max_aggregate_age_hours: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_hours: default_cleanup_interval_hours(),
            max_note_age_days: 0,
            max_aggregate_age_hours: default_max_aggregate_age_hours(),
        }
    }
}

fn default_cleanup_interval_hours() -> u64 {
    24
}

fn default_max_aggregate_age_hours() -> u64 {
    24
}

/// Bootstrap peers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    /// WebSocket URLs of peers to read from and fan out to.
    ///
    /// Records are signed with Ed25519, so every listed peer must accept
    /// Ed25519 signatures. Peers that only verify secp256k1 Schnorr
    /// signatures reject every record. Empty by default: records stay local
    /// until peers are configured.
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,

    /// Timeout for one publication to one peer.
    #[serde(default = "default_publish_timeout_secs")]
    pub publish_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bootstrap_peers: Vec::new(),
            publish_timeout_secs: default_publish_timeout_secs(),
        }
    }
}

fn default_publish_timeout_secs() -> u64 {
    5
}

/// Which follow list a delete action removes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowSource {
    /// The list derived from the tracked feeds.
    #[default]
    Local,
    /// The newest list fetched from the bootstrap peers.
    Remote,
}

/// One-hop follow list reconciliation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FollowsConfig {
    #[serde(default)]
    pub delete_source: FollowSource,

    /// Timeout for the remote follow-list lookup.
    #[serde(default = "default_remote_lookup_timeout_secs")]
    pub remote_lookup_timeout_secs: u64,
}

impl Default for FollowsConfig {
    fn default() -> Self {
        Self {
            delete_source: FollowSource::Local,
            remote_lookup_timeout_secs: default_remote_lookup_timeout_secs(),
        }
    }
}

fn default_remote_lookup_timeout_secs() -> u64 {
    3
}

/// Admin HTTP gateway.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token for the `/v1` routes. Without it every `/v1` request is rejected.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("enabled", &self.enabled)
            .field("host", &self.host)
            .field("port", &self.port)
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3334
}

/// Whitelist policy gate for externally submitted records.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// JSON map of permitted author identity to label. Created on first use.
    #[serde(default)]
    pub whitelist_path: Option<String>,

    /// Reject every externally submitted record.
    #[serde(default = "default_read_only")]
    pub read_only: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            whitelist_path: None,
            read_only: default_read_only(),
        }
    }
}

fn default_read_only() -> bool {
    true
}
