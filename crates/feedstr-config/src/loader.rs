// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./feedstr.toml` > `~/.config/feedstr/feedstr.toml` > `/etc/feedstr/feedstr.toml`
//! with environment variable overrides via `FEEDSTR_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::FeedstrConfig;

/// Sections addressable through `FEEDSTR_<SECTION>_<KEY>`.
const SECTIONS: &[&str] = &[
    "service", "storage", "feeds", "content", "cleanup", "network", "follows", "gateway",
    "policy",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/feedstr/feedstr.toml`
/// 3. `~/.config/feedstr/feedstr.toml`
/// 4. `./feedstr.toml`
/// 5. `FEEDSTR_*` environment variables
pub fn load_config() -> Result<FeedstrConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<FeedstrConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FeedstrConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<FeedstrConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FeedstrConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(FeedstrConfig::default()))
        .merge(Toml::file("/etc/feedstr/feedstr.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("feedstr/feedstr.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("feedstr.toml"))
        .merge(env_provider())
}

/// Environment provider mapping the first underscore after a section name to a dot.
///
/// Uses `Env::map()` rather than `Env::split("_")` so keys containing
/// underscores survive: `FEEDSTR_FEEDS_MAX_CONTENT_LENGTH` maps to
/// `feeds.max_content_length`.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("FEEDSTR_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
