// SPDX-License-Identifier: MIT

//! Thin HTTP client subcommands: enqueue, done, fail, heartbeat, stats, jobs.

use jm_wire::EnqueueRequest;
use jm_worker::ApiClient;
use std::time::{SystemTime, UNIX_EPOCH};

fn client(host: &str, port: u16) -> ApiClient {
    ApiClient::new(format!("http://{host}:{port}"))
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn enqueue(
    host: &str,
    port: u16,
    payload: &str,
    id: Option<String>,
    lane: i64,
    deps: &str,
    dedupe: Option<String>,
) -> anyhow::Result<()> {
    jm_core::validate_payload(payload)?;
    let id = id.unwrap_or_else(|| {
        let now_ms = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        format!("manual-{now_ms}")
    });
    let deps: Vec<String> = deps.split(',').map(str::trim).filter(|d| !d.is_empty()).map(String::from).collect();
    let req = EnqueueRequest { id, lane, payload: payload.to_string(), deps, dedupe_key: dedupe, max_attempts: None };
    let result = client(host, port).enqueue(&req)?;
    print_json(&result)
}

pub fn done(host: &str, port: u16, id: &str, holder: Option<String>) -> anyhow::Result<()> {
    let ok = client(host, port).done(id, holder.as_deref())?;
    print_json(&serde_json::json!({ "ok": ok }))
}

pub fn fail(host: &str, port: u16, id: &str, holder: Option<String>, error: &str) -> anyhow::Result<()> {
    let ok = client(host, port).fail(id, error, holder.as_deref())?;
    print_json(&serde_json::json!({ "ok": ok }))
}

pub fn heartbeat(host: &str, port: u16, id: &str, holder: &str) -> anyhow::Result<()> {
    let ok = client(host, port).heartbeat(id, holder, 90_000)?;
    print_json(&serde_json::json!({ "ok": ok }))
}

pub fn stats(host: &str, port: u16) -> anyhow::Result<()> {
    let stats = client(host, port).stats()?;
    print_json(&stats)
}

pub fn jobs(host: &str, port: u16, status: Option<String>, limit: u32) -> anyhow::Result<()> {
    let result = client(host, port).jobs(status.as_deref(), limit)?;
    for job in &result.jobs {
        let icon = match job.status {
            jm_core::JobStatus::Queued => "\u{25cb}",
            jm_core::JobStatus::Running => "\u{25c9}",
            jm_core::JobStatus::Done => "\u{2713}",
            jm_core::JobStatus::Failed => "\u{2717}",
        };
        let payload: String = job.payload.chars().take(60).collect();
        println!("  {icon} [{:8}] lane={} {}: {payload}", job.status.to_string(), job.lane, job.id);
    }
    Ok(())
}
