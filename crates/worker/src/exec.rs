// SPDX-License-Identifier: MIT

//! Local command execution with a wall-clock bound.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default execution bound for a single `@cmd:` or `#apply` payload.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(120);

/// Result of running a local command.
pub struct ExecOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

/// Run `cmd` through `sh -c`, capturing output, bounded by `timeout`.
/// Polls the child rather than blocking indefinitely so a hung command is
/// killed instead of wedging the worker.
pub fn execute_cmd(cmd: &str, timeout: Duration) -> ExecOutput {
    execute_cmd_watched(cmd, timeout, &mut || true)
}

/// Same as [`execute_cmd`], but `on_tick` is invoked on every poll
/// iteration (roughly every 50ms). Used to drive lease heartbeats during
/// a long-running command; if it returns `false` the command is killed
/// and reported as aborted, since a failed heartbeat means the lease was
/// already reclaimed by another worker.
pub fn execute_cmd_watched(cmd: &str, timeout: Duration, on_tick: &mut dyn FnMut() -> bool) -> ExecOutput {
    let mut child = match Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return ExecOutput { code: 1, stdout: String::new(), stderr: e.to_string(), timed_out: false },
    };

    // Drain stdout/stderr on their own threads as the child runs, rather
    // than only after try_wait reports it exited — a command that writes
    // more than the OS pipe buffer before exiting would otherwise block on
    // write() forever, since nothing is reading the other end yet.
    let stdout_reader = spawn_pipe_reader(child.stdout.take());
    let stderr_reader = spawn_pipe_reader(child.stderr.take());

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let stdout = join_pipe_reader(stdout_reader);
                let stderr = join_pipe_reader(stderr_reader);
                return ExecOutput { code: status.code().unwrap_or(1), stdout, stderr, timed_out: false };
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    join_pipe_reader(stdout_reader);
                    join_pipe_reader(stderr_reader);
                    return ExecOutput {
                        code: 124,
                        stdout: String::new(),
                        stderr: format!("timeout after {}s", timeout.as_secs()),
                        timed_out: true,
                    };
                }
                if !on_tick() {
                    let _ = child.kill();
                    let _ = child.wait();
                    join_pipe_reader(stdout_reader);
                    join_pipe_reader(stderr_reader);
                    return ExecOutput {
                        code: 1,
                        stdout: String::new(),
                        stderr: "aborted: lease lost".to_string(),
                        timed_out: false,
                    };
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                return ExecOutput { code: 1, stdout: String::new(), stderr: e.to_string(), timed_out: false };
            }
        }
    }
}

fn spawn_pipe_reader(pipe: Option<impl Read + Send + 'static>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf);
            buf
        })
    })
}

fn join_pipe_reader(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// `patch -p1 < path`, reported through the same [`ExecOutput`] shape.
pub fn apply_patch(path: &str, timeout: Duration) -> ExecOutput {
    apply_patch_watched(path, timeout, &mut || true)
}

pub fn apply_patch_watched(path: &str, timeout: Duration, on_tick: &mut dyn FnMut() -> bool) -> ExecOutput {
    if !std::path::Path::new(path).is_file() {
        return ExecOutput {
            code: 1,
            stdout: String::new(),
            stderr: format!("patch file not found: {path}"),
            timed_out: false,
        };
    }
    execute_cmd_watched(&format!("patch -p1 < {path}"), timeout, on_tick)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_on_success() {
        let out = execute_cmd("echo hello", Duration::from_secs(5));
        assert_eq!(out.code, 0);
        assert_eq!(out.stdout.trim(), "hello");
        assert!(!out.timed_out);
    }

    #[test]
    fn captures_nonzero_exit_code() {
        let out = execute_cmd("false", Duration::from_secs(5));
        assert_eq!(out.code, 1);
    }

    #[test]
    fn times_out_long_running_command() {
        let out = execute_cmd("sleep 5", Duration::from_millis(100));
        assert!(out.timed_out);
        assert_eq!(out.code, 124);
    }

    #[test]
    fn apply_patch_reports_missing_file() {
        let out = apply_patch("/nonexistent/path.diff", Duration::from_secs(5));
        assert_eq!(out.code, 1);
        assert!(out.stderr.contains("patch file not found"));
    }

    #[test]
    fn drains_output_larger_than_a_pipe_buffer_without_deadlocking() {
        // `yes` with `head` writes well past the typical 64KB pipe buffer
        // before exiting; a worker that only reads after try_wait reports
        // the child done would hang until the timeout instead.
        let out = execute_cmd("yes xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx | head -c 200000", Duration::from_secs(5));
        assert_eq!(out.code, 0);
        assert!(!out.timed_out);
        assert_eq!(out.stdout.len(), 200_000);
    }
}
