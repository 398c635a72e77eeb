// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Deserialization errors from figment and semantic errors from
//! [`validate_config`](crate::validation::validate_config) both end up as
//! [`ConfigError`]s. Each one names the `section.key` it is about and, when
//! the TOML text is at hand, points at the offending line.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity score to suggest a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Top-level tables of `feedstr.toml`.
pub const SECTIONS: &[&str] = &[
    "service", "storage", "feeds", "content", "cleanup", "network", "follows", "gateway",
    "policy",
];

/// Where in which file a diagnostic points.
type Location = (Option<SourceSpan>, Option<NamedSource<String>>);

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown section `[{name}]`")]
    #[diagnostic(
        code(feedstr::config::unknown_section),
        help("{}", section_help(suggestion.as_deref()))
    )]
    UnknownSection {
        name: String,
        suggestion: Option<String>,
        #[label("no such section")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A key that the section does not define.
    #[error("unknown key `{key}` in `[{section}]`")]
    #[diagnostic(
        code(feedstr::config::unknown_key),
        help("{}", key_help(suggestion.as_deref(), section, valid_keys))
    )]
    UnknownKey {
        section: String,
        key: String,
        suggestion: Option<String>,
        valid_keys: Vec<String>,
        #[label("not recognized here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(feedstr::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(feedstr::config::missing_key),
        help("add `{key} = <value>` to feedstr.toml")
    )]
    MissingKey { key: String },

    /// A value that parses but breaks a rule, e.g. a zero interval.
    #[error("`{key}` {message}")]
    #[diagnostic(code(feedstr::config::validation))]
    Validation {
        key: String,
        message: String,
        #[label("rejected value")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// TOML syntax errors, environment parsing problems and the like.
    #[error("configuration error: {0}")]
    #[diagnostic(code(feedstr::config::other))]
    Other(String),
}

impl ConfigError {
    /// Semantic error for the dotted `key`, located later by [`locate_all`].
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            key: key.into(),
            message: message.into(),
            span: None,
            src: None,
        }
    }

    /// The dotted key this error is about, if any.
    pub fn key(&self) -> Option<String> {
        match self {
            Self::UnknownSection { name, .. } => Some(name.clone()),
            Self::UnknownKey { section, key, .. } => Some(format!("{section}.{key}")),
            Self::InvalidType { key, .. }
            | Self::MissingKey { key }
            | Self::Validation { key, .. } => Some(key.clone()),
            Self::Other(_) => None,
        }
    }
}

fn section_help(suggestion: Option<&str>) -> String {
    let sections = SECTIONS.join("], [");
    match suggestion {
        Some(s) => format!("did you mean `[{s}]`? Sections: [{sections}]"),
        None => format!("sections: [{sections}]"),
    }
}

fn key_help(suggestion: Option<&str>, section: &str, valid_keys: &[String]) -> String {
    let keys = valid_keys.join(", ");
    match suggestion {
        Some(s) => format!("did you mean `{s}`? `[{section}]` accepts: {keys}"),
        None => format!("`[{section}]` accepts: {keys}"),
    }
}

/// Convert a `figment::Error` (which may hold several) into diagnostics.
///
/// `toml_sources` pairs file paths with their text; matching errors get a span.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.clone();
            let source = source_of(&error, toml_sources);
            match &error.kind {
                Kind::UnknownField(field, _) if path.is_empty() => {
                    let (span, src) = locate_section(source, field);
                    ConfigError::UnknownSection {
                        name: field.clone(),
                        suggestion: suggest_key(field, SECTIONS),
                        span,
                        src,
                    }
                }
                Kind::UnknownField(field, expected) => {
                    let (span, src) = locate(source, &path, field);
                    ConfigError::UnknownKey {
                        section: path.join("."),
                        key: field.clone(),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.iter().map(|k| k.to_string()).collect(),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => {
                    let mut key = path.clone();
                    key.push(field.to_string());
                    ConfigError::MissingKey { key: key.join(".") }
                }
                Kind::InvalidType(actual, expected) => {
                    let (span, src) = match path.split_last() {
                        Some((field, section)) => locate(source, section, field),
                        None => (None, None),
                    };
                    ConfigError::InvalidType {
                        key: path.join("."),
                        found: actual.to_string(),
                        expected: expected.clone(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// Point every error at its key in the first source that defines it.
///
/// Used for validation errors, which carry a key but no file position.
pub fn locate_all(errors: Vec<ConfigError>, toml_sources: &[(String, String)]) -> Vec<ConfigError> {
    errors
        .into_iter()
        .map(|error| match error {
            ConfigError::Validation {
                key,
                message,
                span: None,
                src: None,
            } => {
                let (span, src) = toml_sources
                    .iter()
                    .map(|(path, content)| locate_dotted(Some((path.as_str(), content.as_str())), &key))
                    .find(|(span, _)| span.is_some())
                    .unwrap_or((None, None));
                ConfigError::Validation {
                    key,
                    message,
                    span,
                    src,
                }
            }
            other => other,
        })
        .collect()
}

/// The source text the error came from, by figment metadata.
fn source_of<'a>(
    error: &figment::Error,
    toml_sources: &'a [(String, String)],
) -> Option<(&'a str, &'a str)> {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    match origin {
        Some(origin) => toml_sources
            .iter()
            .find(|(p, _)| *p == origin)
            .map(|(p, c)| (p.as_str(), c.as_str())),
        // Inline strings carry no file metadata.
        None => match toml_sources {
            [(p, c)] => Some((p.as_str(), c.as_str())),
            _ => None,
        },
    }
}

fn locate(source: Option<(&str, &str)>, section: &[String], field: &str) -> Location {
    let Some((path, content)) = source else {
        return (None, None);
    };
    match find_key_offset(content, section, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(path, content.to_string())),
        ),
        None => (None, None),
    }
}

/// `feeds.max_content_length` or `content.aggregators[0]` to a location.
fn locate_dotted(source: Option<(&str, &str)>, key: &str) -> Location {
    let key = key.split('[').next().unwrap_or(key);
    let mut parts: Vec<String> = key.split('.').map(str::to_string).collect();
    let Some(field) = parts.pop() else {
        return (None, None);
    };
    locate(source, &parts, &field)
}

fn locate_section(source: Option<(&str, &str)>, name: &str) -> Location {
    let Some((path, content)) = source else {
        return (None, None);
    };
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if header_of(line).is_some_and(|h| h == name) {
            let start = offset + line.len() - line.trim_start().len() + 1;
            return (
                Some(SourceSpan::new(start.into(), name.len())),
                Some(NamedSource::new(path, content.to_string())),
            );
        }
        offset += line.len();
    }
    (None, None)
}

/// Table name of a `[section]` or `[[section]]` header line.
fn header_of(line: &str) -> Option<&str> {
    let line = line.trim();
    let inner = line
        .strip_prefix("[[")
        .and_then(|l| l.strip_suffix("]]"))
        .or_else(|| line.strip_prefix('[').and_then(|l| l.strip_suffix(']')))?;
    Some(inner.trim())
}

/// Byte offset of `field` inside the table named by `section`.
///
/// Only lines between the table's header and the next header are searched,
/// so `name` under `[service]` is not confused with `name` elsewhere. An
/// empty `section` searches the lines before the first header.
pub fn find_key_offset(content: &str, section: &[String], field: &str) -> Option<usize> {
    let wanted = section.join(".");
    let mut current = String::new();
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if let Some(header) = header_of(line) {
            current = header.to_string();
        } else if current == wanted {
            let trimmed = line.trim_start();
            let after = trimmed.strip_prefix(field).map(str::trim_start);
            if after.is_some_and(|a| a.starts_with('=')) {
                return Some(offset + line.len() - trimmed.len());
            }
        }
        offset += line.len();
    }
    None
}

/// Closest entry of `valid_keys` to `unknown`, if close enough to be a typo.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|&key| (strsim::jaro_winkler(unknown, key), key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Render a list of `ConfigError`s to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML: &str = "name = \"top\"\n\n[service]\nname = \"x\"\n\n[feeds]\nmin_sampels = 3\n\n[[content.aggregators]]\ndomain = \"\"\n";

    fn section(s: &str) -> Vec<String> {
        s.split('.').map(str::to_string).collect()
    }

    #[test]
    fn typo_in_feeds_key_is_suggested() {
        let valid = &["min_samples", "max_content_length", "check_interval_mins"];
        assert_eq!(suggest_key("min_sampels", valid), Some("min_samples".to_string()));
    }

    #[test]
    fn typo_in_section_name_is_suggested() {
        assert_eq!(suggest_key("gatway", SECTIONS), Some("gateway".to_string()));
        assert_eq!(suggest_key("zzzzzz", SECTIONS), None);
    }

    #[test]
    fn key_offset_stays_inside_its_table() {
        let offset = find_key_offset(TOML, &section("service"), "name").unwrap();
        assert_eq!(&TOML[offset..offset + 8], "name = \"");
        assert!(TOML[..offset].contains("[service]"));

        let top = find_key_offset(TOML, &[], "name").unwrap();
        assert_eq!(top, 0);

        assert!(find_key_offset(TOML, &section("feeds"), "name").is_none());
        assert!(find_key_offset(TOML, &section("gateway"), "name").is_none());
    }

    #[test]
    fn key_offset_handles_array_tables() {
        let offset = find_key_offset(TOML, &section("content.aggregators"), "domain").unwrap();
        assert_eq!(&TOML[offset..offset + 6], "domain");
    }

    #[test]
    fn validation_errors_are_located_by_key() {
        let sources = vec![("feedstr.toml".to_string(), TOML.to_string())];
        let errors = locate_all(
            vec![
                ConfigError::invalid("feeds.min_sampels", "must be positive"),
                ConfigError::invalid("content.aggregators[0]", "needs a domain"),
                ConfigError::invalid("gateway.port", "is taken"),
            ],
            &sources,
        );
        let spans: Vec<Option<usize>> = errors
            .iter()
            .map(|e| match e {
                ConfigError::Validation { span, .. } => span.as_ref().map(|s| s.offset()),
                _ => None,
            })
            .collect();
        assert_eq!(spans[0], Some(TOML.find("min_sampels").unwrap()));
        assert!(spans[1].is_none());
        assert!(spans[2].is_none());
    }

    #[test]
    fn help_lists_section_keys() {
        let err = ConfigError::UnknownKey {
            section: "feeds".into(),
            key: "min_sampels".into(),
            suggestion: Some("min_samples".into()),
            valid_keys: vec!["min_samples".into(), "max_content_length".into()],
            span: None,
            src: None,
        };
        let help = err.help().map(|h| h.to_string()).unwrap_or_default();
        assert_eq!(
            help,
            "did you mean `min_samples`? `[feeds]` accepts: min_samples, max_content_length"
        );
        assert_eq!(err.key().as_deref(), Some("feeds.min_sampels"));
    }
}
