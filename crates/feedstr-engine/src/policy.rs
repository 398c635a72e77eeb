// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Write and read policy for records exchanged with outside clients.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;

use feedstr_core::{kinds, FeedstrError, Filter, Record};

fn storage_err<E: std::error::Error + Send + Sync + 'static>(e: E) -> FeedstrError {
    FeedstrError::Storage {
        source: Box::new(e),
    }
}

/// Identities allowed to write, each with a free-form label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    entries: BTreeMap<String, String>,
}

impl Whitelist {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    /// Load the JSON `{pubkey: label}` file at `path`, creating it with the
    /// service identity as the only entry when it does not exist.
    pub fn load_or_create(path: &Path, service_pubkey: &str) -> Result<Self, FeedstrError> {
        if !path.exists() {
            let mut entries = BTreeMap::new();
            entries.insert(service_pubkey.to_string(), String::new());
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(storage_err)?;
            }
            let body = serde_json::to_string_pretty(&entries).map_err(storage_err)?;
            std::fs::write(path, body).map_err(storage_err)?;
            info!(path = %path.display(), "whitelist created");
            return Ok(Self { entries });
        }
        let body = std::fs::read_to_string(path).map_err(storage_err)?;
        let entries: BTreeMap<String, String> = serde_json::from_str(&body).map_err(|e| {
            FeedstrError::Config(format!("whitelist {} is not valid JSON: {e}", path.display()))
        })?;
        info!(path = %path.display(), entries = entries.len(), "whitelist loaded");
        Ok(Self { entries })
    }

    pub fn contains(&self, pubkey: &str) -> bool {
        self.entries.contains_key(pubkey)
    }

    pub fn label(&self, pubkey: &str) -> Option<&str> {
        self.entries.get(pubkey).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decides which records outside clients may write and read.
#[derive(Debug, Clone)]
pub struct PolicyGate {
    whitelist: Option<Whitelist>,
    read_only: bool,
}

impl PolicyGate {
    pub fn new(whitelist: Option<Whitelist>, read_only: bool) -> Self {
        Self {
            whitelist,
            read_only,
        }
    }

    /// `Err` carries the rejection reason sent back to the client.
    pub fn check_record(&self, record: &Record, external: bool) -> Result<(), String> {
        if external && self.read_only {
            return Err("blocked: read-only".to_string());
        }
        if let Some(whitelist) = &self.whitelist {
            if !whitelist.contains(&record.pubkey) {
                return Err("blocked: not whitelisted".to_string());
            }
        }
        if record.kind == kinds::AGGREGATE {
            return Err("blocked: reserved kind".to_string());
        }
        Ok(())
    }

    /// Queries may never ask for the aggregate kind, which carries private keys.
    pub fn check_filter(&self, filter: &Filter) -> Result<(), String> {
        if filter.kinds.contains(&kinds::AGGREGATE) {
            return Err("blocked: restricted kind".to_string());
        }
        Ok(())
    }

    /// Drop aggregate records from a result set. Filters without a kind
    /// condition would otherwise match them.
    pub fn redact(&self, records: Vec<Record>) -> Vec<Record> {
        records
            .into_iter()
            .filter(|r| r.kind != kinds::AGGREGATE)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedstr_core::Tag;

    fn record(pubkey: &str, kind: u32) -> Record {
        Record {
            id: "ab".repeat(32),
            pubkey: pubkey.to_string(),
            created_at: 1,
            kind,
            tags: vec![Tag::new(["p", "x"])],
            content: String::new(),
            sig: "00".repeat(64),
        }
    }

    #[test]
    fn missing_whitelist_is_created_with_service_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy/whitelist.json");
        let list = Whitelist::load_or_create(&path, "svc").unwrap();
        assert!(list.contains("svc"));
        assert_eq!(list.len(), 1);

        let reloaded = Whitelist::load_or_create(&path, "other").unwrap();
        assert_eq!(reloaded, list);
    }

    #[test]
    fn existing_whitelist_keeps_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whitelist.json");
        std::fs::write(&path, r#"{"alice":"Alice","bob":""}"#).unwrap();
        let list = Whitelist::load_or_create(&path, "svc").unwrap();
        assert_eq!(list.label("alice"), Some("Alice"));
        assert!(!list.contains("svc"));
    }

    #[test]
    fn malformed_whitelist_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whitelist.json");
        std::fs::write(&path, "[not a map").unwrap();
        assert!(matches!(
            Whitelist::load_or_create(&path, "svc"),
            Err(FeedstrError::Config(_))
        ));
    }

    #[test]
    fn read_only_blocks_every_external_write() {
        let gate = PolicyGate::new(None, true);
        assert_eq!(
            gate.check_record(&record("anyone", 1), true),
            Err("blocked: read-only".to_string())
        );
        assert!(gate.check_record(&record("anyone", 1), false).is_ok());
    }

    #[test]
    fn whitelist_limits_authors() {
        let mut entries = BTreeMap::new();
        entries.insert("alice".to_string(), String::new());
        let gate = PolicyGate::new(Some(Whitelist::new(entries)), false);
        assert!(gate.check_record(&record("alice", 1), true).is_ok());
        assert_eq!(
            gate.check_record(&record("mallory", 1), true),
            Err("blocked: not whitelisted".to_string())
        );
    }

    #[test]
    fn aggregate_kind_never_leaves_the_service() {
        let gate = PolicyGate::new(None, false);
        assert!(gate.check_filter(&Filter::new().kind(kinds::TEXT_NOTE)).is_ok());
        assert!(gate.check_filter(&Filter::new().kinds([1, kinds::AGGREGATE])).is_err());
        assert!(gate.check_record(&record("svc", kinds::AGGREGATE), true).is_err());

        let kept = gate.redact(vec![record("a", 1), record("b", kinds::AGGREGATE)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].kind, 1);
    }
}
