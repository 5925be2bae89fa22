// SPDX-License-Identifier: MIT

//! jm-httpd: the HTTP control plane.
//!
//! A thin JSON layer over [`jm_scheduler::Scheduler`]. Handlers translate
//! wire requests into scheduler calls and scheduler errors into the
//! `{"error": "..."}` / status-code mapping the spec defines — no business
//! logic lives here.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use jm_core::{Clock, HolderId, JobId, Lane, SchedulerError};
use jm_scheduler::Scheduler;
use jm_wire::*;
use tower_http::trace::TraceLayer;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Crate version surfaced by `/health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn router(scheduler: Scheduler) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/ready", get(ready))
        .route("/jobs", get(jobs))
        .route("/enqueue", post(enqueue))
        .route("/done", post(done))
        .route("/fail", post(fail))
        .route("/heartbeat", post(heartbeat))
        .route("/expand", post(expand))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(scheduler)
}

async fn not_found() -> Response {
    api_error(StatusCode::NOT_FOUND, "no such route")
}

fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

fn status_code_for(err: &SchedulerError) -> StatusCode {
    match err.status_code() {
        400 => StatusCode::BAD_REQUEST,
        404 => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn scheduler_err_response(err: SchedulerError) -> Response {
    let status = status_code_for(&err);
    api_error(status, err.to_string())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true, version: VERSION.to_string() })
}

async fn stats(State(scheduler): State<Scheduler>) -> Response {
    match scheduler.stats() {
        Ok(s) => Json(StatsResponse { queued: s.queued, running: s.running, done: s.done, failed: s.failed, total: s.total })
            .into_response(),
        Err(e) => scheduler_err_response(e),
    }
}

async fn ready(State(scheduler): State<Scheduler>, Query(q): Query<ReadyQuery>) -> Response {
    let holder = HolderId::new(q.holder);
    let lane = q.lane.map(Lane);
    match scheduler.claim(&holder, lane, q.batch, q.lease_ms) {
        Ok(jobs) => Json(ReadyResponse { jobs }).into_response(),
        Err(e) => scheduler_err_response(e),
    }
}

async fn jobs(State(scheduler): State<Scheduler>, Query(q): Query<JobsQuery>) -> Response {
    match scheduler.list_jobs(q.status, q.limit) {
        Ok(jobs) => Json(JobsResponse { jobs }).into_response(),
        Err(e) => scheduler_err_response(e),
    }
}

async fn enqueue(State(scheduler): State<Scheduler>, Json(req): Json<EnqueueRequest>) -> Response {
    let id = JobId::from(req.id);
    let deps: Vec<&str> = req.deps.iter().map(String::as_str).collect();
    match scheduler.enqueue(&id, Lane(req.lane), &req.payload, &deps, req.dedupe_key.as_deref(), req.max_attempts) {
        Ok(()) => Json(EnqueueResponse { id }).into_response(),
        Err(e) => scheduler_err_response(e),
    }
}

async fn done(State(scheduler): State<Scheduler>, Json(req): Json<DoneRequest>) -> Response {
    let id = JobId::from(req.id);
    let holder = req.holder.map(HolderId::from);
    match scheduler.mark_done(&id, holder.as_ref()) {
        Ok(ok) => Json(OkResponse { ok }).into_response(),
        Err(e) => scheduler_err_response(e),
    }
}

async fn fail(State(scheduler): State<Scheduler>, Json(req): Json<FailRequest>) -> Response {
    let id = JobId::from(req.id);
    let holder = req.holder.map(HolderId::from);
    let error = req.error.unwrap_or_else(|| "unspecified failure".to_string());
    match scheduler.mark_failed(&id, &error, holder.as_ref()) {
        Ok(ok) => Json(OkResponse { ok }).into_response(),
        Err(e) => scheduler_err_response(e),
    }
}

async fn heartbeat(State(scheduler): State<Scheduler>, Json(req): Json<HeartbeatRequest>) -> Response {
    let id = JobId::from(req.id);
    let holder = HolderId::new(req.holder);
    match scheduler.heartbeat(&id, &holder, req.lease_ms) {
        Ok(ok) => Json(HeartbeatResponse { ok }).into_response(),
        Err(e) => scheduler_err_response(e),
    }
}

async fn expand(State(scheduler): State<Scheduler>, Json(req): Json<ExpandRequest>) -> Response {
    let path = std::path::Path::new(&req.plan);
    let compiled = match jm_compiler::compile_plan_file(path) {
        Ok(c) => c,
        Err(e) => return scheduler_err_response(e),
    };

    let now = jm_core::SystemClock.now_ms();
    let jobs: Vec<jm_store::PlanJob> = compiled
        .steps
        .iter()
        .map(|s| jm_store::PlanJob {
            id: &s.global_id,
            lane: s.lane,
            payload: &s.payload,
            dedupe_key: s.dedupe_key.as_deref(),
            max_attempts: 3,
        })
        .collect();

    let id_map: std::collections::HashMap<&str, &JobId> =
        compiled.steps.iter().map(|s| (s.local_id.as_str(), &s.global_id)).collect();
    let deps: Vec<jm_store::PlanDep> = compiled
        .steps
        .iter()
        .flat_map(|s| s.deps.iter().map(move |d| (s, d)))
        .map(|(s, d)| jm_store::PlanDep { job_id: &s.global_id, dep_id: id_map[d.as_str()] })
        .collect();

    match scheduler.store().apply_plan(&jobs, &deps, now) {
        Ok(()) => Json(ExpandResponse { plan_id: compiled.plan_id, steps: compiled.steps.len() }).into_response(),
        Err(e) => scheduler_err_response(SchedulerError::Store(e.to_string())),
    }
}
