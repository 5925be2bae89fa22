// SPDX-License-Identifier: MIT

//! The worker poll loop: fetch ready jobs, dispatch each, sleep, repeat.

use crate::client::ApiClient;
use crate::dispatch::execute_job_local_with_lease;
use std::time::Duration;
use tracing::{error, info, warn};

/// Execution mode. `Local` runs payloads directly; `Llm` only claims and
/// logs `@file:` jobs for a human or agent to complete manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMode {
    Local,
    Llm,
}

pub struct WorkerConfig {
    pub holder: String,
    pub lane: Option<i64>,
    pub batch: u32,
    pub lease_ms: i64,
    pub poll_interval: Duration,
    pub exec_timeout: Duration,
    pub mode: WorkerMode,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            holder: "local-1".to_string(),
            lane: None,
            batch: 1,
            lease_ms: 90_000,
            poll_interval: Duration::from_secs(2),
            exec_timeout: crate::exec::DEFAULT_EXEC_TIMEOUT,
            mode: WorkerMode::Local,
        }
    }
}

/// Runs until `should_stop` returns true. Split out as a parameter rather
/// than an infinite loop so callers (the CLI's signal handler, tests) can
/// terminate it cleanly.
pub fn worker_loop(client: &ApiClient, config: &WorkerConfig, should_stop: impl Fn() -> bool) {
    info!(holder = %config.holder, lane = ?config.lane, mode = ?config.mode, "worker loop starting");

    while !should_stop() {
        let jobs = match client.ready(&config.holder, config.lane, config.batch, config.lease_ms) {
            Ok(jobs) => jobs,
            Err(e) => {
                error!(error = %e, "poll failed");
                std::thread::sleep(config.poll_interval);
                continue;
            }
        };

        for job in &jobs {
            info!(job = %job.id, payload = %truncate_for_log(&job.payload), "claimed");
            match config.mode {
                WorkerMode::Local => {
                    let ok = execute_job_local_with_lease(
                        client,
                        job.id.as_str(),
                        &job.payload,
                        &config.holder,
                        config.exec_timeout,
                        config.lease_ms,
                    );
                    if !ok {
                        warn!(job = %job.id, "job failed");
                    }
                }
                WorkerMode::Llm => {
                    info!(job = %job.id, payload = %job.payload, "llm job (manual): mark done via the API when complete");
                }
            }
        }

        std::thread::sleep(if jobs.is_empty() { config.poll_interval } else { Duration::from_millis(50) });
    }
}

fn truncate_for_log(s: &str) -> String {
    s.chars().take(80).collect()
}
