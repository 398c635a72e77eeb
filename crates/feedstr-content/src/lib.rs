// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content pipeline for feedstr.
//!
//! Turns parsed feeds and items into unsigned profile and note records:
//! a markup-to-text converter over an HTML5 parse tree, `<link>` scanning
//! for page discovery, and the site rules that tweak presentation for
//! aggregator domains.

pub mod markdown;
pub mod page;
pub mod pipeline;
pub mod rules;

pub use page::{LinkTag, link_tags};
pub use pipeline::{ContentPipeline, ProfileMetadata, clean_text, provenance, truncate_body};
pub use rules::{FeedRule, RuleSet, SubcommunityRule, TitleEchoRule};
