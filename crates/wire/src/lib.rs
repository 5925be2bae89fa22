// SPDX-License-Identifier: MIT

//! jm-wire: JSON request/response bodies shared between `jm-httpd` and
//! any HTTP client (the CLI's thin-client subcommands, tests).

use jm_core::{Job, JobId, JobStatus};
use serde::{Deserialize, Serialize};

/// `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub version: String,
}

/// `GET /stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub queued: u64,
    pub running: u64,
    pub done: u64,
    pub failed: u64,
    pub total: u64,
}

/// `GET /ready` query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyQuery {
    pub holder: String,
    #[serde(default)]
    pub lane: Option<i64>,
    #[serde(default = "default_batch")]
    pub batch: u32,
    #[serde(default = "default_lease_ms")]
    pub lease_ms: i64,
}

fn default_batch() -> u32 {
    1
}

fn default_lease_ms() -> i64 {
    90_000
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadyResponse {
    pub jobs: Vec<Job>,
}

/// `GET /jobs` query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct JobsQuery {
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

#[derive(Debug, Clone, Serialize)]
pub struct JobsResponse {
    pub jobs: Vec<Job>,
}

/// `POST /enqueue` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub id: String,
    #[serde(default)]
    pub lane: i64,
    pub payload: String,
    #[serde(default)]
    pub deps: Vec<String>,
    #[serde(default)]
    pub dedupe_key: Option<String>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueResponse {
    pub id: JobId,
}

/// `POST /done` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoneRequest {
    pub id: String,
    #[serde(default)]
    pub holder: Option<String>,
}

/// `POST /fail` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailRequest {
    pub id: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub holder: Option<String>,
}

/// `POST /done` and `POST /fail` share this response shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// `POST /heartbeat` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub id: String,
    pub holder: String,
    #[serde(default = "default_lease_ms")]
    pub lease_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub ok: bool,
}

/// `POST /expand` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpandRequest {
    pub plan: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpandResponse {
    pub plan_id: String,
    pub steps: usize,
}

/// Uniform error body: `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}
