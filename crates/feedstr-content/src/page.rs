// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `<link>` elements of a web page.

use scraper::Html;

/// Attributes of one `<link>` element, trimmed, with entities decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkTag {
    pub rel: String,
    pub link_type: String,
    pub href: String,
}

impl LinkTag {
    /// Whether `rel` lists `token`, case-insensitively.
    pub fn has_rel(&self, token: &str) -> bool {
        self.rel
            .split_whitespace()
            .any(|r| r.eq_ignore_ascii_case(token))
    }
}

/// Every `<link>` with a non-empty `href`, in document order.
pub fn link_tags(document: &str) -> Vec<LinkTag> {
    let page = Html::parse_document(document);
    page.tree
        .nodes()
        .filter_map(|node| node.value().as_element())
        .filter(|e| e.name() == "link")
        .filter_map(|e| {
            let href = e.attr("href").map(str::trim).filter(|h| !h.is_empty())?;
            let get = |name| e.attr(name).map(str::trim).unwrap_or_default().to_string();
            Some(LinkTag {
                rel: get("rel"),
                link_type: get("type"),
                href: href.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_are_collected_in_order_with_decoded_attributes() {
        let page = r#"<!doctype html><html><head>
            <link rel="Alternate" type="application/rss+xml" href="/feed?a=1&amp;b=2">
            <link rel="stylesheet">
            <link rel="shortcut icon" href=" /icon.png ">
            </head><body><p>a < b</p></body></html>"#;
        let links = link_tags(page);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].href, "/feed?a=1&b=2");
        assert_eq!(links[0].link_type, "application/rss+xml");
        assert!(links[0].has_rel("alternate"));
        assert_eq!(links[1].href, "/icon.png");
        assert!(links[1].has_rel("icon"));
        assert!(!links[1].has_rel("shortcut-icon"));
    }

    #[test]
    fn links_outside_the_head_are_found() {
        let links = link_tags(r#"<body><link rel="icon" href="/late.ico"></body>"#);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "/late.ico");
    }
}
