// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use feedstr_core::{unix_now, FeedstrError, Filter, Record};
use feedstr_engine::{FeedSummary, FollowAction, ImportEntry};
use feedstr_identity::verify_record;

use crate::server::GatewayState;

const MAX_QUERY_LIMIT: usize = 500;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub name: String,
    pub pubkey: String,
    pub description: String,
    pub url: String,
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub url: String,
}

/// Body of `POST /v1/follows`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum FollowRequest {
    Sync,
    Add,
    Delete { pubkey: String },
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordQuery {
    pub author: Option<String>,
    pub kind: Option<u32>,
    pub since: Option<i64>,
    pub until: Option<i64>,
    pub limit: Option<usize>,
}

/// Verdict on a submitted record, shaped like a peer acknowledgement.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: String,
    pub accepted: bool,
    pub message: String,
}

/// Map an engine error to a status and JSON body.
pub struct ApiError(FeedstrError);

impl From<FeedstrError> for ApiError {
    fn from(e: FeedstrError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            FeedstrError::Validation(_) => StatusCode::BAD_REQUEST,
            FeedstrError::NotFound(_) => StatusCode::NOT_FOUND,
            FeedstrError::Duplicate(_) => StatusCode::CONFLICT,
            FeedstrError::Fetch { .. } | FeedstrError::Parse { .. } => StatusCode::BAD_GATEWAY,
            FeedstrError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            FeedstrError::Shutdown => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        name: state.info.name.clone(),
        pubkey: state.controller.service_pubkey().to_string(),
        description: state.info.description.clone(),
        url: state.info.public_url.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.info.start_time.elapsed().as_secs(),
    })
}

/// GET /v1/feeds, optionally filtered by `?query=`.
pub async fn list_feeds(
    State(state): State<GatewayState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<FeedSummary>>, ApiError> {
    let feeds = match params.query.as_deref() {
        Some(query) => state.controller.search(query).await?,
        None => state.controller.list_feeds().await?,
    };
    Ok(Json(feeds))
}

/// POST /v1/feeds
pub async fn register_feed(
    State(state): State<GatewayState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<FeedSummary>), ApiError> {
    let entity = state.controller.register(&body.url).await?;
    Ok((StatusCode::CREATED, Json(FeedSummary::from(&entity))))
}

/// DELETE /v1/feeds/{pubkey}
pub async fn delete_feed(
    State(state): State<GatewayState>,
    Path(pubkey): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.controller.delete(&pubkey).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(FeedstrError::NotFound(format!("feed {pubkey}")).into())
    }
}

/// POST /v1/check: run a feed check now.
pub async fn check_feeds(State(state): State<GatewayState>) -> Result<Response, ApiError> {
    let report = state.controller.check_at(unix_now()).await?;
    Ok(Json(report).into_response())
}

/// GET /v1/export
pub async fn export_feeds(
    State(state): State<GatewayState>,
) -> Result<Json<Vec<ImportEntry>>, ApiError> {
    Ok(Json(state.controller.export().await?))
}

/// POST /v1/import
pub async fn import_feeds(
    State(state): State<GatewayState>,
    Json(entries): Json<Vec<ImportEntry>>,
) -> Result<Response, ApiError> {
    let outcomes = state.controller.import(entries).await?;
    Ok(Json(outcomes).into_response())
}

/// POST /v1/follows
pub async fn update_follows(
    State(state): State<GatewayState>,
    Json(body): Json<FollowRequest>,
) -> Result<Response, ApiError> {
    let action = match body {
        FollowRequest::Sync => FollowAction::Sync,
        FollowRequest::Add => FollowAction::Add,
        FollowRequest::Delete { pubkey } => FollowAction::Delete(pubkey),
    };
    match state.controller.follow(action).await? {
        Some(record) => Ok(Json(record).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// GET /v1/records
pub async fn query_records(
    State(state): State<GatewayState>,
    Query(params): Query<RecordQuery>,
) -> Result<Response, ApiError> {
    let mut filter = Filter::new().limit(params.limit.unwrap_or(100).min(MAX_QUERY_LIMIT));
    if let Some(author) = params.author {
        filter = filter.author(author);
    }
    if let Some(kind) = params.kind {
        filter = filter.kind(kind);
    }
    filter.since = params.since;
    filter.until = params.until;

    if let Err(reason) = state.policy.check_filter(&filter) {
        return Ok((StatusCode::FORBIDDEN, Json(ErrorResponse { error: reason })).into_response());
    }
    let records = state.policy.redact(state.log.query(&filter).await?);
    Ok(Json(records).into_response())
}

/// POST /v1/records: store a client-signed record if policy allows it.
pub async fn submit_record(
    State(state): State<GatewayState>,
    Json(record): Json<Record>,
) -> Result<Response, ApiError> {
    let rejected = |message: String| {
        (
            StatusCode::FORBIDDEN,
            Json(SubmitResponse {
                id: record.id.clone(),
                accepted: false,
                message,
            }),
        )
            .into_response()
    };
    if let Err(e) = verify_record(&record) {
        return Ok(rejected(format!("invalid: {e}")));
    }
    if let Err(reason) = state.policy.check_record(&record, true) {
        return Ok(rejected(reason));
    }
    state.log.save(&record).await?;
    tracing::info!(id = %record.id, pubkey = %record.pubkey, "client record stored");
    Ok(Json(SubmitResponse {
        id: record.id.clone(),
        accepted: true,
        message: String::new(),
    })
    .into_response())
}
