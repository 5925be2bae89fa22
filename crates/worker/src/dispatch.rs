// SPDX-License-Identifier: MIT

//! Local payload dispatch: maps a claimed job's payload to an execution
//! strategy and reports the outcome back through the control plane.

use crate::client::ApiClient;
use crate::exec::{apply_patch_watched, execute_cmd_watched, DEFAULT_EXEC_TIMEOUT};
use crate::safety::is_cmd_safe;
use std::time::{Duration, Instant};
use tracing::warn;

/// Truncation applied to error messages sent back via `/fail`, matching
/// the original tool's 500-char cap on reported stderr/stdout.
const ERROR_TRUNCATE: usize = 500;

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Execute one claimed job locally. Returns `true` on success (job marked
/// done), `false` on any failure path (job marked failed, or the report
/// itself errored — in which case the job is left for the stale sweep).
pub fn execute_job_local(client: &ApiClient, job_id: &str, payload: &str, holder: &str) -> bool {
    execute_job_local_with_timeout(client, job_id, payload, holder, DEFAULT_EXEC_TIMEOUT)
}

/// `lease_ms` drives the heartbeat cadence for commands that may run long:
/// roughly every third of the lease window, per the spec's heartbeat rule.
/// Pass `lease_ms <= 0` to disable in-flight heartbeating (used by tests).
pub fn execute_job_local_with_timeout(
    client: &ApiClient,
    job_id: &str,
    payload: &str,
    holder: &str,
    timeout: Duration,
) -> bool {
    let outcome = dispatch(client, job_id, holder, payload, timeout, 0);
    match outcome {
        Outcome::Done => report(client, job_id, holder, Ok(())),
        Outcome::Failed(msg) => report(client, job_id, holder, Err(msg)),
    }
}

pub fn execute_job_local_with_lease(
    client: &ApiClient,
    job_id: &str,
    payload: &str,
    holder: &str,
    timeout: Duration,
    lease_ms: i64,
) -> bool {
    let outcome = dispatch(client, job_id, holder, payload, timeout, lease_ms);
    match outcome {
        Outcome::Done => report(client, job_id, holder, Ok(())),
        Outcome::Failed(msg) => report(client, job_id, holder, Err(msg)),
    }
}

enum Outcome {
    Done,
    Failed(String),
}

/// Heartbeats roughly every `lease_ms / 3`; a failed heartbeat aborts the
/// in-flight command, since the lease has already been reclaimed.
fn heartbeat_tick(client: &ApiClient, job_id: &str, holder: &str, lease_ms: i64) -> impl FnMut() -> bool + '_ {
    let interval = Duration::from_millis((lease_ms / 3).max(1_000) as u64);
    let mut last = Instant::now();
    move || {
        if lease_ms <= 0 {
            return true;
        }
        if last.elapsed() < interval {
            return true;
        }
        last = Instant::now();
        client.heartbeat(job_id, holder, lease_ms).unwrap_or(false)
    }
}

fn dispatch(client: &ApiClient, job_id: &str, holder: &str, payload: &str, timeout: Duration, lease_ms: i64) -> Outcome {
    if let Some(cmd) = payload.strip_prefix("@cmd:") {
        if !is_cmd_safe(cmd) {
            return Outcome::Failed(format!("blocked command: {}", truncate(cmd.trim(), 60)));
        }
        let mut tick = heartbeat_tick(client, job_id, holder, lease_ms);
        let out = execute_cmd_watched(cmd, timeout, &mut tick);
        return if out.code == 0 {
            Outcome::Done
        } else {
            let msg = if !out.stderr.is_empty() {
                out.stderr
            } else if !out.stdout.is_empty() {
                out.stdout
            } else {
                format!("exit code {}", out.code)
            };
            Outcome::Failed(truncate(&msg, ERROR_TRUNCATE))
        };
    }

    if let Some(rest) = payload.strip_prefix("@file:") {
        if rest.contains("#apply") {
            let path = rest.split('#').next().unwrap_or(rest);
            let mut tick = heartbeat_tick(client, job_id, holder, lease_ms);
            let out = apply_patch_watched(path, timeout, &mut tick);
            return if out.code == 0 {
                Outcome::Done
            } else {
                let msg = if !out.stderr.is_empty() { out.stderr } else { out.stdout };
                Outcome::Failed(truncate(&msg, ERROR_TRUNCATE))
            };
        }
        if rest.contains("#test") {
            let path = rest.split('#').next().unwrap_or(rest);
            return if std::path::Path::new(path).exists() {
                Outcome::Done
            } else {
                Outcome::Failed(format!("test failed: {path}"))
            };
        }
        return Outcome::Failed("LLM-required job; not executable in local mode".to_string());
    }

    if payload.starts_with("@doc:") || payload.starts_with("@url:") || payload.starts_with("@git:") || payload.starts_with("@gh:") {
        return Outcome::Done;
    }

    Outcome::Failed(format!("unknown payload type: {}", truncate(payload, 40)))
}

fn report(client: &ApiClient, job_id: &str, holder: &str, outcome: Result<(), String>) -> bool {
    match outcome {
        Ok(()) => match client.done(job_id, Some(holder)) {
            Ok(ok) => ok,
            Err(e) => {
                warn!(job = job_id, error = %e, "failed to report job completion");
                false
            }
        },
        Err(msg) => {
            if let Err(e) = client.fail(job_id, &msg, Some(holder)) {
                warn!(job = job_id, error = %e, "failed to report job failure");
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new("http://127.0.0.1:0")
    }

    fn run(payload: &str) -> Outcome {
        dispatch(&client(), "job-1", "w1", payload, Duration::from_secs(1), 0)
    }

    #[test]
    fn metadata_only_prefixes_are_always_done() {
        assert!(matches!(run("@doc:readme"), Outcome::Done));
        assert!(matches!(run("@url:http://x"), Outcome::Done));
        assert!(matches!(run("@git:abcdef"), Outcome::Done));
        assert!(matches!(run("@gh:123"), Outcome::Done));
    }

    #[test]
    fn bare_file_pointer_is_llm_required() {
        match run("@file:src/lib.rs") {
            Outcome::Failed(msg) => assert!(msg.contains("LLM-required")),
            Outcome::Done => panic!("expected LLM-required failure"),
        }
    }

    #[test]
    fn file_test_suffix_checks_existence() {
        let file = tempfile::NamedTempFile::new().expect("tempfile");
        let path = file.path().to_str().expect("utf8 path");
        match run(&format!("@file:{path}#test")) {
            Outcome::Done => {}
            Outcome::Failed(msg) => panic!("expected done, got {msg}"),
        }
    }

    #[test]
    fn file_test_suffix_fails_for_missing_file() {
        match run("@file:/nonexistent/path#test") {
            Outcome::Failed(msg) => assert!(msg.contains("test failed")),
            Outcome::Done => panic!("expected failure"),
        }
    }

    #[test]
    fn blocked_cmd_never_executes() {
        match run("@cmd:sudo rm -rf /") {
            Outcome::Failed(msg) => assert!(msg.contains("blocked command")),
            Outcome::Done => panic!("expected blocked command failure"),
        }
    }

    #[test]
    fn unknown_pointer_prefix_fails() {
        match run("@weird:thing") {
            Outcome::Failed(msg) => assert!(msg.contains("unknown payload type")),
            Outcome::Done => panic!("expected failure"),
        }
    }
}
