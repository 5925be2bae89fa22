// SPDX-License-Identifier: MIT

//! `jm worker`: run a poll loop against a running server.

use jm_worker::{worker_loop, ApiClient, WorkerConfig, WorkerMode};
use std::time::Duration;

pub fn run(
    host: &str,
    port: u16,
    holder: Option<String>,
    lane: Option<i64>,
    batch: u32,
    poll: f64,
    mode: &str,
) -> anyhow::Result<()> {
    let mode = match mode {
        "local" => WorkerMode::Local,
        "llm" => WorkerMode::Llm,
        other => anyhow::bail!("unknown worker mode: {other}"),
    };
    let holder = holder.unwrap_or_else(|| format!("worker-{}", std::process::id()));

    let client = ApiClient::new(format!("http://{host}:{port}"));
    let config = WorkerConfig {
        holder,
        lane,
        batch,
        poll_interval: Duration::from_secs_f64(poll),
        mode,
        ..WorkerConfig::default()
    };

    worker_loop(&client, &config, || false);
    Ok(())
}
