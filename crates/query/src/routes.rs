/*
 * SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{Request, Response};
use axum::routing::get;
use meterbridge_model::DomainRecord;
use meterbridge_mqtt::{IntakeStats, IntakeStatsTracker};
use serde::{Deserialize, Serialize};
use tracing::Span;

use crate::errors::ApiError;
use crate::source::RecordSource;

/// Shared state for every handler.
#[derive(Clone)]
pub struct ApiState {
    pub source: Arc<dyn RecordSource>,
    pub stats: Arc<IntakeStatsTracker>,
    /// Used when a request doesn't carry its own `timeout_ms`.
    pub query_timeout: Duration,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordQuery {
    pub timeout_ms: Option<u64>,
}

impl RecordQuery {
    fn timeout(&self, default: Duration) -> Result<Duration, ApiError> {
        match self.timeout_ms {
            None => Ok(default),
            Some(0) => Err(ApiError::InvalidTimeout(
                "timeout_ms must be greater than zero".to_string(),
            )),
            Some(ms) => Ok(Duration::from_millis(ms)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub records: usize,
    pub intake: IntakeStats,
}

pub fn get_router(state: ApiState) -> Router {
    let trace_layer = tower_http::trace::TraceLayer::new_for_http()
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::debug!("started {} {}", request.method(), request.uri().path())
        })
        .on_response(|response: &Response<Body>, latency: Duration, _span: &Span| {
            tracing::debug!(status = %response.status(), "response generated in {:?}", latency)
        });

    Router::new()
        .route("/records", get(list_records))
        .route("/records/{key}", get(get_record))
        .route("/stats", get(get_stats))
        .route("/health", get(health))
        .layer(trace_layer)
        .with_state(state)
}

async fn get_record(
    State(state): State<ApiState>,
    Path(key): Path<String>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<DomainRecord>, ApiError> {
    let timeout = query.timeout(state.query_timeout)?;
    match tokio::time::timeout(timeout, state.source.record(&key)).await {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err(ApiError::NotFound { key }),
        Err(_) => {
            tracing::warn!(%key, ?timeout, "record lookup timed out");
            Err(ApiError::Timeout { key, timeout })
        }
    }
}

async fn list_records(State(state): State<ApiState>) -> Json<Vec<DomainRecord>> {
    Json(state.source.records().await)
}

async fn get_stats(State(state): State<ApiState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        records: state.source.record_count(),
        intake: state.stats.to_stats(),
    })
}

async fn health() -> &'static str {
    "OK"
}
