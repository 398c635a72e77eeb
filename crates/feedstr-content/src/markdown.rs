// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rich markup to plain, markdown-flavoured text.
//!
//! The rule set is fixed:
//! - headings collapse to their trimmed text
//! - `img` becomes its absolute URL on a line of its own
//! - `a` becomes `text (absolute-url)`, using `title` or `aria-label` when
//!   there is no visible text, plain text when there is no usable href,
//!   and nothing when there is neither
//! - block elements become paragraphs, `br` a line break, `li` a bullet
//! - `script`, `style` and similar elements are dropped

use scraper::{ElementRef, Html, Node};
use url::Url;

const DROPPED: &[&str] = &[
    "script", "style", "head", "noscript", "iframe", "template", "svg", "form", "button",
    "title",
];

const BLOCKS: &[&str] = &[
    "p", "div", "section", "article", "blockquote", "ul", "ol", "table", "tr", "pre", "figure",
    "figcaption", "header", "footer", "aside", "main", "nav", "dl", "dd", "dt", "hr",
];

/// Convert an HTML fragment, resolving relative URLs against `base`.
///
/// Parsing follows the HTML5 algorithm, so malformed markup degrades the way
/// it does in a browser instead of failing.
pub fn convert(input: &str, base: Option<&Url>) -> String {
    let fragment = Html::parse_fragment(input);
    let mut out = String::new();
    render_children(fragment.root_element(), base, &mut out);
    normalize(&out)
}

/// Resolve `href` to an absolute URL when possible.
pub fn absolutize(href: &str, base: Option<&Url>) -> String {
    if let Ok(url) = Url::parse(href) {
        return url.to_string();
    }
    match base.and_then(|b| b.join(href).ok()) {
        Some(url) => url.to_string(),
        None => href.to_string(),
    }
}

fn render_children(e: ElementRef<'_>, base: Option<&Url>, out: &mut String) {
    for child in e.children() {
        match child.value() {
            Node::Text(text) => push_text(text, out),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    render_element(element, base, out);
                }
            }
            _ => {}
        }
    }
}

/// Append text with HTML whitespace collapsing.
fn push_text(text: &str, out: &mut String) {
    let mut pending_space = text.starts_with(char::is_whitespace);
    for word in text.split_whitespace() {
        if pending_space && !at_boundary(out) {
            out.push(' ');
        }
        out.push_str(word);
        pending_space = true;
    }
    if text.ends_with(char::is_whitespace) && !at_boundary(out) {
        out.push(' ');
    }
}

fn at_boundary(out: &str) -> bool {
    out.is_empty() || out.ends_with([' ', '\n'])
}

fn inner(e: ElementRef<'_>, base: Option<&Url>) -> String {
    let mut text = String::new();
    render_children(e, base, &mut text);
    text
}

fn attr<'a>(e: &ElementRef<'a>, name: &str) -> Option<&'a str> {
    e.value().attr(name).map(str::trim).filter(|v| !v.is_empty())
}

fn render_element(e: ElementRef<'_>, base: Option<&Url>, out: &mut String) {
    let name = e.value().name();
    if DROPPED.contains(&name) {
        return;
    }

    match name {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => paragraph(inner(e, base).trim(), out),
        "br" => out.push('\n'),
        "img" => {
            if let Some(src) = attr(&e, "src") {
                out.push('\n');
                out.push_str(&absolutize(src, base));
                out.push('\n');
            }
        }
        "a" => render_anchor(e, base, out),
        "li" => {
            let text = inner(e, base);
            let text = text.trim();
            if !text.is_empty() {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str("- ");
                out.push_str(text);
                out.push('\n');
            }
        }
        "strong" | "b" => wrap(e, base, "**", out),
        "em" | "i" => wrap(e, base, "*", out),
        "code" => wrap(e, base, "`", out),
        _ if BLOCKS.contains(&name) => paragraph(inner(e, base).trim(), out),
        _ => render_children(e, base, out),
    }
}

fn render_anchor(e: ElementRef<'_>, base: Option<&Url>, out: &mut String) {
    let visible = inner(e, base);
    let visible = visible.trim();
    let label = if visible.is_empty() {
        attr(&e, "title")
            .or_else(|| attr(&e, "aria-label"))
            .unwrap_or_default()
    } else {
        visible
    };

    let href = attr(&e, "href").filter(|h| *h != "#" && !h.starts_with("javascript:"));

    match (href, label.is_empty()) {
        (None, true) => {}
        (None, false) => out.push_str(label),
        (Some(href), true) => out.push_str(&absolutize(href, base)),
        (Some(href), false) => {
            let abs = absolutize(href, base);
            if abs == label {
                out.push_str(&abs);
            } else {
                out.push_str(&format!("{label} ({abs})"));
            }
        }
    }
}

fn wrap(e: ElementRef<'_>, base: Option<&Url>, marker: &str, out: &mut String) {
    let text = inner(e, base);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return;
    }
    if text.starts_with(' ') && !at_boundary(out) {
        out.push(' ');
    }
    out.push_str(marker);
    out.push_str(trimmed);
    out.push_str(marker);
    if text.ends_with(' ') {
        out.push(' ');
    }
}

fn paragraph(text: &str, out: &mut String) {
    if text.is_empty() {
        return;
    }
    out.push_str("\n\n");
    out.push_str(text);
    out.push_str("\n\n");
}

/// Trim lines and collapse runs of blank lines to one.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        out.push_str(line);
        blank_run = 0;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/posts/1").unwrap()
    }

    fn md(input: &str) -> String {
        convert(input, Some(&base()))
    }

    #[test]
    fn headings_collapse_to_trimmed_text() {
        assert_eq!(md("<h2>  Release   notes </h2><p>Body</p>"), "Release notes\n\nBody");
    }

    #[test]
    fn images_become_absolute_urls_on_their_own_line() {
        assert_eq!(
            md(r#"Look<img src="/img/cat.png">here"#),
            "Look\nhttps://example.com/img/cat.png\nhere"
        );
    }

    #[test]
    fn anchors_render_text_and_absolute_url() {
        assert_eq!(
            md(r#"See <a href="../about">the page</a>."#),
            "See the page (https://example.com/about)."
        );
    }

    #[test]
    fn anchors_fall_back_to_title_then_aria_label() {
        assert_eq!(
            md(r#"<a href="/x" title="Title text"></a>"#),
            "Title text (https://example.com/x)"
        );
        assert_eq!(
            md(r#"<a href="/x" aria-label="Label"> </a>"#),
            "Label (https://example.com/x)"
        );
    }

    #[test]
    fn anchors_without_href_keep_text_or_vanish() {
        assert_eq!(md(r##"<a href="#">just text</a>"##), "just text");
        assert_eq!(md("before<a></a>after"), "beforeafter");
    }

    #[test]
    fn scripts_are_dropped_and_lists_bulleted() {
        assert_eq!(
            md("<script>alert(1)</script><ul><li>one</li><li>two</li></ul>"),
            "- one\n- two"
        );
    }

    #[test]
    fn inline_emphasis_is_marked() {
        assert_eq!(md("a <strong>bold</strong> move"), "a **bold** move");
    }

    #[test]
    fn unterminated_markup_keeps_the_text_before_it() {
        assert_eq!(convert("<p>fine</p><a href=\"oops", None), "fine");
    }

    #[test]
    fn stray_angle_brackets_stay_in_prose() {
        assert_eq!(md("<p>if a < b and 1<2 then</p>"), "if a < b and 1<2 then");
    }

    #[test]
    fn entities_in_text_and_attributes_are_decoded() {
        assert_eq!(
            md(r#"<a href="/x?a=1&amp;b=2" title="Caf&eacute;"></a> &rarr; &frac12;"#),
            "Café (https://example.com/x?a=1&b=2) → ½"
        );
    }

    #[test]
    fn absolutize_without_base_keeps_relative_href() {
        assert_eq!(absolutize("/x", None), "/x");
        assert_eq!(absolutize("https://a.example/x", None), "https://a.example/x");
    }
}
