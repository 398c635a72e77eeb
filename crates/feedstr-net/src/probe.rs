// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feed discovery and icon lookup for websites.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use feedstr_content::link_tags;
use feedstr_content::markdown::absolutize;
use feedstr_core::{Icon, SiteProbe};

/// Content types that mark a response, or an advertised `<link>`, as a feed.
const FEED_TYPES: &[&str] = &[
    "rss+xml",
    "atom+xml",
    "feed+json",
    "text/xml",
    "application/xml",
];

/// [`SiteProbe`] over HTTP.
#[derive(Clone)]
pub struct HttpSiteProbe {
    client: reqwest::Client,
    icon_timeout: Duration,
}

impl HttpSiteProbe {
    pub fn new(client: reqwest::Client, icon_timeout: Duration) -> Self {
        Self {
            client,
            icon_timeout,
        }
    }

    async fn get_text(&self, url: &str) -> Option<(String, String)> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(url, error = %e, "site request failed");
                return None;
            }
        };
        if !response.status().is_success() {
            debug!(url, status = %response.status(), "site request rejected");
            return None;
        }
        let content_type = header_content_type(&response);
        let body = response.text().await.ok()?;
        Some((content_type, body))
    }

    async fn download_icon(&self, url: &str) -> Option<Icon> {
        let response = self
            .client
            .get(url)
            .timeout(self.icon_timeout)
            .send()
            .await
            .ok()?;
        if response.status() != reqwest::StatusCode::OK {
            return None;
        }
        let declared = header_content_type(&response);
        let bytes = response.bytes().await.ok()?.to_vec();
        let content_type = sniff_image(&bytes)
            .map(str::to_string)
            .or_else(|| declared.starts_with("image/").then_some(declared))?;
        Some(Icon {
            url: url.to_string(),
            content_type,
            bytes,
        })
    }
}

#[async_trait]
impl SiteProbe for HttpSiteProbe {
    async fn discover_feed_url(&self, url: &str) -> Option<String> {
        let (content_type, body) = self.get_text(url).await?;
        if FEED_TYPES.iter().any(|t| content_type.contains(t)) {
            return Some(url.to_string());
        }
        if content_type.contains("text/html") {
            return feed_link_from_html(&body, url);
        }
        None
    }

    async fn find_icon(&self, site_url: &str, feed_url: &str) -> Option<Icon> {
        let mut candidates = Vec::new();
        if !site_url.is_empty() {
            if let Some((_, body)) = self.get_text(site_url).await {
                candidates.extend(icon_links_from_html(&body, site_url));
            }
            candidates.extend(favicon_url(site_url));
        }
        candidates.extend(favicon_url(feed_url));
        candidates.dedup();

        for candidate in candidates {
            if let Some(icon) = self.download_icon(&candidate).await {
                debug!(url = %candidate, "icon found");
                return Some(icon);
            }
        }
        None
    }
}

fn header_content_type(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// First `<link>` advertising a feed, resolved against `page_url`.
pub fn feed_link_from_html(body: &str, page_url: &str) -> Option<String> {
    let links = link_tags(body);
    let base = Url::parse(page_url).ok();
    FEED_TYPES.iter().find_map(|typ| {
        links
            .iter()
            .find(|l| l.link_type.to_ascii_lowercase().contains(typ))
            .map(|l| absolutize(&l.href, base.as_ref()))
    })
}

/// Icons declared with `<link rel="... icon ...">`, in document order.
pub fn icon_links_from_html(body: &str, page_url: &str) -> Vec<String> {
    let base = Url::parse(page_url).ok();
    link_tags(body)
        .into_iter()
        .filter(|l| l.has_rel("icon"))
        .map(|l| absolutize(&l.href, base.as_ref()))
        .collect()
}

/// `<scheme>://<host>/favicon.ico` for the host of `link`.
pub fn favicon_url(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let host = url.host_str()?;
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    Some(format!("{}://{host}{port}/favicon.ico", url.scheme()))
}

/// Image type recognised from magic bytes.
pub fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.starts_with(&[0, 0, 1, 0]) {
        Some("image/x-icon")
    } else {
        None
    }
}
