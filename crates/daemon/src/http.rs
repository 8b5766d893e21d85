// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status surface: a small read-mostly HTTP API for external tooling (the
//! `uo` CLI, or a human with curl) to observe and nudge the Supervisor
//! without touching the shared medium directly.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use uo_engine::readonly_fs::MountOps;

use crate::supervisor::{Supervisor, SupervisorError};

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for SupervisorError {
    fn into_response(self) -> Response {
        let status = match self {
            SupervisorError::TriggerRefusedOutsideWindow => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

pub fn router<M: MountOps + 'static>(supervisor: Arc<Supervisor<M>>) -> Router {
    Router::new()
        .route("/status", get(get_status::<M>))
        .route("/activity", get(get_activity::<M>))
        .route("/trigger", post(post_trigger::<M>))
        .route("/monitor/start", post(post_monitor_start::<M>))
        .route("/monitor/stop", post(post_monitor_stop::<M>))
        .route("/reset-state", post(post_reset_state::<M>))
        .with_state(supervisor)
}

async fn get_status<M: MountOps + 'static>(State(supervisor): State<Arc<Supervisor<M>>>) -> impl IntoResponse {
    Json(supervisor.status_body())
}

async fn get_activity<M: MountOps + 'static>(State(supervisor): State<Arc<Supervisor<M>>>) -> impl IntoResponse {
    Json(supervisor.activity_body())
}

async fn post_trigger<M: MountOps + 'static>(State(supervisor): State<Arc<Supervisor<M>>>) -> Response {
    match supervisor.trigger() {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn post_monitor_start<M: MountOps + 'static>(State(supervisor): State<Arc<Supervisor<M>>>) -> impl IntoResponse {
    supervisor.monitor_start();
    StatusCode::ACCEPTED
}

async fn post_monitor_stop<M: MountOps + 'static>(State(supervisor): State<Arc<Supervisor<M>>>) -> impl IntoResponse {
    supervisor.monitor_stop();
    StatusCode::ACCEPTED
}

async fn post_reset_state<M: MountOps + 'static>(State(supervisor): State<Arc<Supervisor<M>>>) -> Response {
    match supervisor.request_reset() {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
