// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Site-specific formatting rules.
//!
//! Rules only adjust presentation: display names, hashtags and whether an
//! item description is worth repeating. They never change provenance or
//! timestamps.

use feedstr_core::{FeedItem, ParsedFeed};
use url::Url;

/// A formatting rule consulted by the content pipeline.
///
/// Every hook has a neutral default so rules implement only what they change.
pub trait FeedRule: Send + Sync + std::fmt::Debug {
    /// Replacement for the feed title in the profile name.
    fn display_name(&self, _feed: &ParsedFeed) -> Option<String> {
        None
    }

    /// Hashtag (without `#`) surfaced in the profile description and in every item.
    fn hashtag(&self, _feed: &ParsedFeed) -> Option<String> {
        None
    }

    /// Whether the item description merely repeats the title.
    fn echoes_title(&self, _feed: &ParsedFeed, _item: &FeedItem) -> bool {
        false
    }
}

/// Whether the host of `link` is `domain` or one of its subdomains.
fn host_matches(link: &str, domain: &str) -> bool {
    let Ok(url) = Url::parse(link) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    let domain = domain.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Aggregator sites scoping feeds to a sub-community path, e.g. `reddit.com/r/<name>`.
#[derive(Debug, Clone)]
pub struct SubcommunityRule {
    pub domain: String,
    pub path_prefix: String,
}

impl SubcommunityRule {
    pub fn new(domain: impl Into<String>, path_prefix: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            path_prefix: path_prefix.into(),
        }
    }

    /// Sub-community name from the feed's site link.
    pub fn community(&self, feed: &ParsedFeed) -> Option<String> {
        if !host_matches(&feed.link, &self.domain) {
            return None;
        }
        let url = Url::parse(&feed.link).ok()?;
        let rest = url.path().strip_prefix(self.path_prefix.as_str())?;
        let name = rest.split('/').next().unwrap_or_default();
        (!name.is_empty()).then(|| name.to_string())
    }
}

impl FeedRule for SubcommunityRule {
    fn display_name(&self, feed: &ParsedFeed) -> Option<String> {
        self.community(feed)
            .map(|name| format!("{}{name}", self.path_prefix))
    }

    fn hashtag(&self, feed: &ParsedFeed) -> Option<String> {
        self.community(feed)
    }
}

/// Sites whose item descriptions duplicate their titles by convention.
#[derive(Debug, Clone, Default)]
pub struct TitleEchoRule {
    pub domains: Vec<String>,
}

impl TitleEchoRule {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            domains: domains.into_iter().map(Into::into).collect(),
        }
    }
}

impl FeedRule for TitleEchoRule {
    fn echoes_title(&self, feed: &ParsedFeed, _item: &FeedItem) -> bool {
        self.domains.iter().any(|d| host_matches(&feed.link, d))
    }
}

/// Ordered rule list; the first rule with an opinion wins.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn FeedRule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, rule: impl FeedRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn push(&mut self, rule: Box<dyn FeedRule>) {
        self.rules.push(rule);
    }

    pub fn display_name(&self, feed: &ParsedFeed) -> Option<String> {
        self.rules.iter().find_map(|r| r.display_name(feed))
    }

    pub fn hashtag(&self, feed: &ParsedFeed) -> Option<String> {
        self.rules.iter().find_map(|r| r.hashtag(feed))
    }

    pub fn echoes_title(&self, feed: &ParsedFeed, item: &FeedItem) -> bool {
        self.rules.iter().any(|r| r.echoes_title(feed, item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(link: &str) -> ParsedFeed {
        ParsedFeed {
            link: link.to_string(),
            ..ParsedFeed::default()
        }
    }

    #[test]
    fn subcommunity_is_read_from_path() {
        let rule = SubcommunityRule::new("reddit.com", "/r/");
        let f = feed("https://www.reddit.com/r/rust/");
        assert_eq!(rule.community(&f).as_deref(), Some("rust"));
        assert_eq!(rule.display_name(&f).as_deref(), Some("/r/rust"));
        assert_eq!(rule.hashtag(&f).as_deref(), Some("rust"));
    }

    #[test]
    fn subcommunity_requires_matching_host_and_prefix() {
        let rule = SubcommunityRule::new("reddit.com", "/r/");
        assert!(rule.community(&feed("https://example.com/r/rust")).is_none());
        assert!(rule.community(&feed("https://notreddit.com/r/rust")).is_none());
        assert!(rule.community(&feed("https://reddit.com/user/someone")).is_none());
        assert!(rule.community(&feed("https://reddit.com/r/")).is_none());
    }

    #[test]
    fn title_echo_matches_domain_and_subdomains() {
        let rule = TitleEchoRule::new(["stacker.news"]);
        let item = FeedItem::default();
        assert!(rule.echoes_title(&feed("https://stacker.news/~bitcoin"), &item));
        assert!(rule.echoes_title(&feed("https://www.stacker.news"), &item));
        assert!(!rule.echoes_title(&feed("https://example.com/stacker.news"), &item));
    }

    #[test]
    fn rule_set_uses_first_opinion() {
        let rules = RuleSet::new()
            .with(SubcommunityRule::new("reddit.com", "/r/"))
            .with(SubcommunityRule::new("reddit.com", "/user/"))
            .with(TitleEchoRule::new(["reddit.com"]));
        let f = feed("https://reddit.com/r/rust");
        assert_eq!(rules.display_name(&f).as_deref(), Some("/r/rust"));
        assert!(rules.echoes_title(&f, &FeedItem::default()));
    }
}
