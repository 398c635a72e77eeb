// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the `RecordLog` trait.

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};
use tracing::debug;

use feedstr_core::{Filter, FeedstrError, Record, RecordLog, Tag};

use crate::database::{map_tr_err, Database};

/// Record log backed by the `records` and `record_tags` tables.
#[derive(Clone)]
pub struct SqliteRecordLog {
    db: Database,
}

impl SqliteRecordLog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn open(path: &str) -> Result<Self, FeedstrError> {
        Ok(Self::new(Database::open(path).await?))
    }

    pub async fn open_in_memory() -> Result<Self, FeedstrError> {
        Ok(Self::new(Database::open_in_memory().await?))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<usize, FeedstrError> {
        self.db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
            })
            .await
            .map(|n| n.max(0) as usize)
            .map_err(map_tr_err)
    }
}

/// WHERE clause and bound values for `filter`, ignoring `limit`.
fn where_clause(filter: &Filter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    fn placeholders(n: usize) -> String {
        vec!["?"; n].join(", ")
    }

    if !filter.ids.is_empty() {
        clauses.push(format!("id IN ({})", placeholders(filter.ids.len())));
        values.extend(filter.ids.iter().cloned().map(Value::Text));
    }
    if !filter.authors.is_empty() {
        clauses.push(format!("pubkey IN ({})", placeholders(filter.authors.len())));
        values.extend(filter.authors.iter().cloned().map(Value::Text));
    }
    if !filter.kinds.is_empty() {
        clauses.push(format!("kind IN ({})", placeholders(filter.kinds.len())));
        values.extend(filter.kinds.iter().map(|&k| Value::Integer(i64::from(k))));
    }
    if let Some(since) = filter.since {
        clauses.push("created_at >= ?".to_string());
        values.push(Value::Integer(since));
    }
    if let Some(until) = filter.until {
        clauses.push("created_at <= ?".to_string());
        values.push(Value::Integer(until));
    }
    for (key, accepted) in &filter.tags {
        clauses.push(format!(
            "seq IN (SELECT record_seq FROM record_tags WHERE key = ? AND value IN ({}))",
            placeholders(accepted.len())
        ));
        values.push(Value::Text(key.clone()));
        values.extend(accepted.iter().cloned().map(Value::Text));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

fn limit_clause(filter: &Filter) -> String {
    match filter.limit {
        Some(limit) => format!(" LIMIT {limit}"),
        None => String::new(),
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let tags_json: String = row.get(4)?;
    let tags: Vec<Tag> = serde_json::from_str(&tags_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let kind: i64 = row.get(3)?;
    Ok(Record {
        id: row.get(0)?,
        pubkey: row.get(1)?,
        created_at: row.get(2)?,
        kind: u32::try_from(kind).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Integer, Box::new(e))
        })?,
        tags,
        content: row.get(5)?,
        sig: row.get(6)?,
    })
}

#[async_trait]
impl RecordLog for SqliteRecordLog {
    async fn save(&self, record: &Record) -> Result<(), FeedstrError> {
        let record = record.clone();
        let tags_json = serde_json::to_string(&record.tags).map_err(|e| FeedstrError::Storage {
            source: Box::new(e),
        })?;
        let inserted = self
            .db
            .connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let tx = conn.transaction()?;
                let changed = tx.execute(
                    "INSERT OR IGNORE INTO records (id, pubkey, created_at, kind, tags, content, sig)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        record.id,
                        record.pubkey,
                        record.created_at,
                        i64::from(record.kind),
                        tags_json,
                        record.content,
                        record.sig,
                    ],
                )?;
                if changed == 0 {
                    return Ok(false);
                }
                let seq = tx.last_insert_rowid();
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO record_tags (record_seq, key, value) VALUES (?1, ?2, ?3)",
                    )?;
                    for tag in &record.tags {
                        if let (Some(key), Some(value)) = (tag.key(), tag.value()) {
                            stmt.execute(params![seq, key, value])?;
                        }
                    }
                }
                tx.commit()?;
                Ok(true)
            })
            .await
            .map_err(map_tr_err)?;
        if !inserted {
            debug!("record already stored, ignoring");
        }
        Ok(())
    }

    async fn query(&self, filter: &Filter) -> Result<Vec<Record>, FeedstrError> {
        let (clause, values) = where_clause(filter);
        let sql = format!(
            "SELECT id, pubkey, created_at, kind, tags, content, sig FROM records{clause}
             ORDER BY created_at DESC, seq DESC{}",
            limit_clause(filter)
        );
        self.db
            .connection()
            .call(move |conn| -> Result<Vec<Record>, rusqlite::Error> {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(values), row_to_record)?;
                let records = rows.collect::<Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn delete(&self, filter: &Filter) -> Result<usize, FeedstrError> {
        let (clause, values) = where_clause(filter);
        let select = format!(
            "SELECT seq FROM records{clause} ORDER BY created_at DESC, seq DESC{}",
            limit_clause(filter)
        );
        let removed = self
            .db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                let tx = conn.transaction()?;
                let seqs: Vec<i64> = {
                    let mut stmt = tx.prepare(&select)?;
                    let rows = stmt.query_map(params_from_iter(values), |row| row.get(0))?;
                    rows.collect::<Result<_, _>>()?
                };
                let mut removed = 0;
                {
                    let mut drop_tags = tx.prepare("DELETE FROM record_tags WHERE record_seq = ?1")?;
                    let mut drop_record = tx.prepare("DELETE FROM records WHERE seq = ?1")?;
                    for seq in &seqs {
                        drop_tags.execute(params![seq])?;
                        removed += drop_record.execute(params![seq])?;
                    }
                }
                tx.commit()?;
                Ok(removed)
            })
            .await
            .map_err(map_tr_err)?;
        debug!(removed, "records deleted");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_where_clause() {
        let (clause, values) = where_clause(&Filter::new());
        assert!(clause.is_empty());
        assert!(values.is_empty());
    }

    #[test]
    fn conditions_are_joined_with_and() {
        let filter = Filter::new()
            .author("aa")
            .kinds([0, 1])
            .tag("proxy", "u")
            .since(5);
        let (clause, values) = where_clause(&filter);
        assert_eq!(
            clause,
            " WHERE pubkey IN (?) AND kind IN (?, ?) AND created_at >= ? AND seq IN (SELECT record_seq FROM record_tags WHERE key = ? AND value IN (?))"
        );
        assert_eq!(values.len(), 6);
    }

    #[test]
    fn limit_is_rendered_only_when_set() {
        assert_eq!(limit_clause(&Filter::new()), "");
        assert_eq!(limit_clause(&Filter::new().limit(3)), " LIMIT 3");
    }
}
