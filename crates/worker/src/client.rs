// SPDX-License-Identifier: MIT

//! Blocking HTTP client over the control plane, used by the worker's poll
//! loop. A blocking client keeps the worker's execution model simple: one
//! thread polls, dispatches, and heartbeats in lockstep, matching how the
//! original tool's single-threaded loop behaves.

use jm_core::Job;
use jm_wire::{
    DoneRequest, EnqueueRequest, EnqueueResponse, ExpandRequest, ExpandResponse, FailRequest,
    HeartbeatRequest, HeartbeatResponse, JobsResponse, OkResponse, ReadyResponse, StatsResponse,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), http: reqwest::blocking::Client::new() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn check(resp: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, ClientError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let message = resp.text().unwrap_or_default();
            Err(ClientError::Server { status, message })
        }
    }

    pub fn ready(&self, holder: &str, lane: Option<i64>, batch: u32, lease_ms: i64) -> Result<Vec<Job>, ClientError> {
        let mut url = format!("{}?holder={holder}&batch={batch}&lease_ms={lease_ms}", self.url("/ready"));
        if let Some(lane) = lane {
            url.push_str(&format!("&lane={lane}"));
        }
        let resp = Self::check(self.http.get(url).send()?)?;
        Ok(resp.json::<ReadyResponse>()?.jobs)
    }

    pub fn done(&self, id: &str, holder: Option<&str>) -> Result<bool, ClientError> {
        let body = DoneRequest { id: id.to_string(), holder: holder.map(String::from) };
        let resp = Self::check(self.http.post(self.url("/done")).json(&body).send()?)?;
        Ok(resp.json::<OkResponse>()?.ok)
    }

    pub fn fail(&self, id: &str, error: &str, holder: Option<&str>) -> Result<bool, ClientError> {
        let body = FailRequest {
            id: id.to_string(),
            error: Some(error.to_string()),
            holder: holder.map(String::from),
        };
        let resp = Self::check(self.http.post(self.url("/fail")).json(&body).send()?)?;
        Ok(resp.json::<OkResponse>()?.ok)
    }

    pub fn heartbeat(&self, id: &str, holder: &str, lease_ms: i64) -> Result<bool, ClientError> {
        let body = HeartbeatRequest { id: id.to_string(), holder: holder.to_string(), lease_ms };
        let resp = Self::check(self.http.post(self.url("/heartbeat")).json(&body).send()?)?;
        Ok(resp.json::<HeartbeatResponse>()?.ok)
    }

    pub fn enqueue(&self, req: &EnqueueRequest) -> Result<EnqueueResponse, ClientError> {
        let resp = Self::check(self.http.post(self.url("/enqueue")).json(req).send()?)?;
        Ok(resp.json()?)
    }

    pub fn expand(&self, plan: &str) -> Result<ExpandResponse, ClientError> {
        let body = ExpandRequest { plan: plan.to_string() };
        let resp = Self::check(self.http.post(self.url("/expand")).json(&body).send()?)?;
        Ok(resp.json()?)
    }

    pub fn stats(&self) -> Result<StatsResponse, ClientError> {
        let resp = Self::check(self.http.get(self.url("/stats")).send()?)?;
        Ok(resp.json()?)
    }

    pub fn jobs(&self, status: Option<&str>, limit: u32) -> Result<JobsResponse, ClientError> {
        let mut url = format!("{}?limit={limit}", self.url("/jobs"));
        if let Some(status) = status {
            url.push_str(&format!("&status={status}"));
        }
        let resp = Self::check(self.http.get(url).send()?)?;
        Ok(resp.json()?)
    }

    pub fn health(&self) -> Result<bool, ClientError> {
        let resp = self.http.get(self.url("/health")).send()?;
        Ok(resp.status().is_success())
    }
}
