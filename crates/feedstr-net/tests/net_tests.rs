// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP collaborators against wiremock, peers against a local WebSocket server.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feedstr_config::model::FeedsConfig;
use feedstr_core::{FeedSource, FeedstrError, Filter, PeerNetwork, Record, SiteProbe, Tag};
use feedstr_net::{build_http_client, HttpFeedSource, HttpSiteProbe, RelayPool};

const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Mock Feed</title><link>https://mock.example/</link><description>d</description>
  <item><title>One</title><link>https://mock.example/1</link><guid>1</guid>
    <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate></item>
</channel></rss>"#;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

fn client() -> reqwest::Client {
    build_http_client(&FeedsConfig::default()).unwrap()
}

#[tokio::test]
async fn feed_source_parses_served_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(RSS),
        )
        .mount(&server)
        .await;

    let source = HttpFeedSource::new(client());
    let feed = source
        .fetch(&format!("{}/feed.xml", server.uri()))
        .await
        .unwrap();
    assert_eq!(feed.title, "Mock Feed");
    assert_eq!(feed.items.len(), 1);
}

#[tokio::test]
async fn feed_source_reports_http_errors_as_fetch_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = HttpFeedSource::new(client())
        .fetch(&format!("{}/gone.xml", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, FeedstrError::Fetch { .. }));
}

#[tokio::test]
async fn discovery_accepts_feed_content_types_directly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml; charset=utf-8")
                .set_body_string(RSS),
        )
        .mount(&server)
        .await;

    let probe = HttpSiteProbe::new(client(), Duration::from_secs(2));
    let url = format!("{}/feed.xml", server.uri());
    assert_eq!(probe.discover_feed_url(&url).await, Some(url));
}

#[tokio::test]
async fn discovery_follows_advertised_link_in_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blog/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(
                    r#"<html><head><link rel="alternate" type="application/rss+xml" href="/blog/rss"></head></html>"#,
                ),
        )
        .mount(&server)
        .await;

    let probe = HttpSiteProbe::new(client(), Duration::from_secs(2));
    let found = probe
        .discover_feed_url(&format!("{}/blog/", server.uri()))
        .await;
    assert_eq!(found, Some(format!("{}/blog/rss", server.uri())));
}

#[tokio::test]
async fn discovery_gives_up_on_other_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(PNG),
        )
        .mount(&server)
        .await;

    let probe = HttpSiteProbe::new(client(), Duration::from_secs(2));
    assert_eq!(probe.discover_feed_url(&server.uri()).await, None);
}

#[tokio::test]
async fn icon_lookup_prefers_declared_icon() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(r#"<link rel="icon" href="/static/icon.png">"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/static/icon.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG))
        .mount(&server)
        .await;

    let probe = HttpSiteProbe::new(client(), Duration::from_secs(2));
    let site = format!("{}/", server.uri());
    let icon = probe
        .find_icon(&site, &format!("{}/feed.xml", server.uri()))
        .await
        .unwrap();
    assert_eq!(icon.url, format!("{}/static/icon.png", server.uri()));
    assert_eq!(icon.content_type, "image/png");
    assert_eq!(icon.extension(), "png");
}

#[tokio::test]
async fn icon_lookup_falls_back_to_feed_host_favicon() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/favicon.ico"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8, 0, 1, 0, 1, 0]))
        .mount(&server)
        .await;

    let probe = HttpSiteProbe::new(client(), Duration::from_secs(2));
    let icon = probe
        .find_icon("", &format!("{}/feed.xml", server.uri()))
        .await
        .unwrap();
    assert_eq!(icon.extension(), "ico");
}

#[tokio::test]
async fn icon_lookup_rejects_non_images() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<p>not an icon</p>"),
        )
        .mount(&server)
        .await;

    let probe = HttpSiteProbe::new(client(), Duration::from_secs(2));
    let site = format!("{}/", server.uri());
    assert!(probe.find_icon(&site, &site).await.is_none());
}

fn follow_list(id: &str, created_at: i64) -> Record {
    Record {
        id: id.to_string(),
        pubkey: "aa".repeat(32),
        created_at,
        kind: 3,
        tags: vec![Tag::new(["p", "bb"])],
        content: String::new(),
        sig: "00".repeat(64),
    }
}

/// Minimal peer: answers subscriptions from `stored`, acknowledges events with `accept`.
async fn spawn_peer(stored: Vec<Record>, accept: bool) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let stored = stored.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(msg)) = ws.next().await {
                    let Message::Text(text) = msg else { continue };
                    let frame: Vec<Value> = serde_json::from_str(text.as_str()).unwrap();
                    let replies: Vec<String> = match frame[0].as_str() {
                        Some("REQ") => {
                            let sub = frame[1].as_str().unwrap_or_default().to_string();
                            stored
                                .iter()
                                .map(|r| json!(["EVENT", sub, r]).to_string())
                                .chain(std::iter::once(json!(["EOSE", sub]).to_string()))
                                .collect()
                        }
                        Some("EVENT") => {
                            let id = frame[1]["id"].as_str().unwrap_or_default().to_string();
                            vec![json!(["OK", id, accept, ""]).to_string()]
                        }
                        _ => Vec::new(),
                    };
                    for reply in replies {
                        if ws.send(Message::Text(reply.into())).await.is_err() {
                            return;
                        }
                    }
                }
            });
        }
    });
    format!("ws://{addr}")
}

#[tokio::test]
async fn fetch_latest_picks_newest_across_peers() {
    let a = spawn_peer(vec![follow_list("old", 10)], true).await;
    let b = spawn_peer(vec![follow_list("new", 20), follow_list("older", 5)], true).await;
    let pool = RelayPool::new(vec![a, b], Duration::from_secs(2));

    let latest = pool
        .fetch_latest(&Filter::new().kind(3), Duration::from_secs(2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, "new");
}

#[tokio::test]
async fn unreachable_peers_are_skipped() {
    let live = spawn_peer(vec![follow_list("only", 1)], true).await;
    let dead = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("ws://{addr}")
    };
    let pool = RelayPool::new(vec![dead, live], Duration::from_secs(2));
    let latest = pool
        .fetch_latest(&Filter::new().kind(3), Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(latest.map(|r| r.id).as_deref(), Some("only"));
}

#[tokio::test]
async fn publish_counts_accepting_peers() {
    let yes = spawn_peer(Vec::new(), true).await;
    let no = spawn_peer(Vec::new(), false).await;
    let pool = RelayPool::new(vec![yes, no], Duration::from_secs(2));
    assert_eq!(pool.publish(&follow_list("x", 1)).await, 1);
}
