// SPDX-License-Identifier: MIT

//! `jm run`: ensure a server is up, expand a plan, print join instructions,
//! and optionally spawn local workers against it.

use jm_worker::{worker_loop, ApiClient, WorkerConfig, WorkerMode};
use std::process::{Command, Stdio};
use std::time::Duration;

fn is_server_running(host: &str, port: u16) -> bool {
    ApiClient::new(format!("http://{host}:{port}")).health().unwrap_or(false)
}

fn spawn_server(db: &str, host: &str, port: u16) -> anyhow::Result<()> {
    let exe = std::env::current_exe()?;
    let log_dir = std::path::Path::new(db).parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = log_dir {
        std::fs::create_dir_all(dir)?;
    }
    let log_path = log_dir.map(|d| d.join("server.log")).unwrap_or_else(|| "server.log".into());
    let log_file = std::fs::OpenOptions::new().create(true).append(true).open(&log_path)?;

    Command::new(exe)
        .args(["server", "--db", db, "--host", host, "--port"])
        .arg(port.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::from(log_file.try_clone()?))
        .stderr(Stdio::from(log_file))
        .spawn()?;

    for _ in 0..40 {
        std::thread::sleep(Duration::from_millis(150));
        if is_server_running(host, port) {
            return Ok(());
        }
    }
    println!("[jm] WARNING: server may not have started");
    Ok(())
}

/// `i` is 1-based; `total` is the number of spawned workers. The first
/// worker gets lane 1, the last gets lane 3, everything in between gets
/// lane 2 -- a simple spread heuristic, not a scheduling policy.
fn spawn_lane(i: u32, total: u32) -> i64 {
    if i == 1 {
        1
    } else if i == total {
        3
    } else {
        2
    }
}

pub fn run(plan: &str, agents: u32, spawn_local: bool, db: &str, host: &str, port: u16) -> anyhow::Result<()> {
    if is_server_running(host, port) {
        println!("[jm] server already running on http://{host}:{port}");
    } else {
        println!("[jm] starting server on http://{host}:{port} ...");
        spawn_server(db, host, port)?;
    }

    println!("[jm] expanding plan: {plan}");
    super::expand::run(db, plan)?;

    let stats = ApiClient::new(format!("http://{host}:{port}")).stats()?;
    println!("[jm] stats: {}", serde_json::to_string(&stats)?);

    println!();
    if agents > 0 {
        println!("[jm] join commands for {agents} agent pane(s):");
        println!("{}", "-".repeat(60));
        for i in 1..=agents {
            println!("  jm worker --holder pane-{i} --poll 2");
        }
        println!("{}", "-".repeat(60));
        println!();
    }

    println!("{}", super::contracts::worker_contract(host, port, "pane-N"));
    println!("{}", super::contracts::executor_contract(host, port));

    if spawn_local && agents > 0 {
        println!("[jm] spawning {agents} local workers ...");
        let mut handles = Vec::new();
        for i in 1..=agents {
            let lane = spawn_lane(i, agents);
            let client = ApiClient::new(format!("http://{host}:{port}"));
            let handle = std::thread::spawn(move || {
                let config = WorkerConfig {
                    holder: format!("local-{i}"),
                    lane: Some(lane),
                    batch: 1,
                    poll_interval: Duration::from_millis(200),
                    mode: WorkerMode::Local,
                    ..WorkerConfig::default()
                };
                worker_loop(&client, &config, || false);
            });
            println!("  spawned worker local-{i} lane={lane}");
            handles.push(handle);
        }
        println!("[jm] {} local workers running", handles.len());
        for handle in handles {
            let _ = handle.join();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_worker_gets_lane_one() {
        assert_eq!(spawn_lane(1, 3), 1);
    }

    #[test]
    fn last_worker_gets_lane_three() {
        assert_eq!(spawn_lane(3, 3), 3);
    }

    #[test]
    fn middle_workers_get_lane_two() {
        assert_eq!(spawn_lane(2, 3), 2);
    }

    #[test]
    fn single_worker_is_both_first_and_last_but_first_wins() {
        assert_eq!(spawn_lane(1, 1), 1);
    }
}
