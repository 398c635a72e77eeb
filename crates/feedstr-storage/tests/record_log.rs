// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record log behaviour against a real SQLite database.

use feedstr_core::{kinds, Filter, Record, RecordLog, Tag, Timestamp};
use feedstr_storage::SqliteRecordLog;
use tempfile::tempdir;

fn record(id: &str, pubkey: &str, kind: u32, created_at: Timestamp, proxy: &str) -> Record {
    Record {
        id: id.to_string(),
        pubkey: pubkey.to_string(),
        created_at,
        kind,
        tags: vec![Tag::new(["proxy", proxy, "rss"])],
        content: format!("content of {id}"),
        sig: "00".repeat(64),
    }
}

#[tokio::test]
async fn saved_records_round_trip_through_query() {
    let log = SqliteRecordLog::open_in_memory().await.unwrap();
    let rec = record("a1", "alice", kinds::TEXT_NOTE, 100, "https://a/feed#1");
    log.save(&rec).await.unwrap();

    let found = log.query(&Filter::new().ids(["a1"])).await.unwrap();
    assert_eq!(found, vec![rec]);
}

#[tokio::test]
async fn saving_a_duplicate_id_is_a_noop() {
    let log = SqliteRecordLog::open_in_memory().await.unwrap();
    let rec = record("a1", "alice", kinds::TEXT_NOTE, 100, "u");
    log.save(&rec).await.unwrap();
    log.save(&rec).await.unwrap();
    assert_eq!(log.count().await.unwrap(), 1);
}

#[tokio::test]
async fn query_orders_newest_first_with_ties_by_arrival() {
    let log = SqliteRecordLog::open_in_memory().await.unwrap();
    log.save(&record("old", "alice", 1, 10, "u")).await.unwrap();
    log.save(&record("tie-first", "alice", 1, 20, "u")).await.unwrap();
    log.save(&record("tie-second", "alice", 1, 20, "u")).await.unwrap();

    let ids: Vec<String> = log
        .query(&Filter::new())
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, ["tie-second", "tie-first", "old"]);

    let newest = log.query(&Filter::new().limit(1)).await.unwrap();
    assert_eq!(newest[0].id, "tie-second");
}

#[tokio::test]
async fn tag_conditions_match_first_value() {
    let log = SqliteRecordLog::open_in_memory().await.unwrap();
    log.save(&record("x", "alice", 1, 1, "https://a/feed#1")).await.unwrap();
    log.save(&record("y", "alice", 1, 2, "https://a/feed#2")).await.unwrap();

    let hits = log
        .query(&Filter::new().tag("proxy", "https://a/feed#2"))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "y");

    let none = log.query(&Filter::new().tag("proxy", "rss")).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn author_kind_and_window_conditions_combine() {
    let log = SqliteRecordLog::open_in_memory().await.unwrap();
    log.save(&record("p", "alice", kinds::PROFILE, 5, "u")).await.unwrap();
    log.save(&record("n1", "alice", kinds::TEXT_NOTE, 10, "u")).await.unwrap();
    log.save(&record("n2", "bob", kinds::TEXT_NOTE, 15, "u")).await.unwrap();
    log.save(&record("n3", "alice", kinds::TEXT_NOTE, 30, "u")).await.unwrap();

    let hits = log
        .query(
            &Filter::new()
                .author("alice")
                .kind(kinds::TEXT_NOTE)
                .since(10)
                .until(20),
        )
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "n1");
}

#[tokio::test]
async fn delete_removes_matches_and_reports_count() {
    let log = SqliteRecordLog::open_in_memory().await.unwrap();
    log.save(&record("p", "alice", kinds::PROFILE, 5, "u")).await.unwrap();
    log.save(&record("n1", "alice", kinds::TEXT_NOTE, 10, "u")).await.unwrap();
    log.save(&record("n2", "bob", kinds::TEXT_NOTE, 15, "u")).await.unwrap();

    let removed = log
        .delete(&Filter::new().author("alice").kinds([kinds::PROFILE, kinds::TEXT_NOTE]))
        .await
        .unwrap();
    assert_eq!(removed, 2);

    let left = log.query(&Filter::new()).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].id, "n2");
    assert!(log.query(&Filter::new().tag("proxy", "u").author("alice")).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_with_limit_takes_newest_first() {
    let log = SqliteRecordLog::open_in_memory().await.unwrap();
    for (i, ts) in [10, 20, 30].into_iter().enumerate() {
        log.save(&record(&format!("r{i}"), "alice", 1, ts, "u")).await.unwrap();
    }
    let removed = log.delete(&Filter::new().limit(2)).await.unwrap();
    assert_eq!(removed, 2);
    let left = log.query(&Filter::new()).await.unwrap();
    assert_eq!(left[0].id, "r0");
}

#[tokio::test]
async fn records_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("log.db");
    let path = path.to_str().unwrap();
    {
        let log = SqliteRecordLog::open(path).await.unwrap();
        log.save(&record("keep", "alice", 1, 1, "u")).await.unwrap();
        log.database().checkpoint().await.unwrap();
    }
    let log = SqliteRecordLog::open(path).await.unwrap();
    assert_eq!(log.count().await.unwrap(), 1);
}
