// SPDX-License-Identifier: MIT

//! Black-box tests driving the compiled `jm` binary as a subprocess,
//! per the CLI-level pass described alongside the unit-level scenario
//! tests in `jm-scheduler` and `jm-compiler`.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use assert_cmd::Command;
use rusqlite::Connection;
use serial_test::serial;
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

fn jm() -> Command {
    Command::cargo_bin("jm").expect("jm binary")
}

fn write_plan(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("plan.md");
    std::fs::write(&path, body).expect("write plan");
    path
}

#[test]
fn expand_compiles_a_two_step_plan_into_job_rows_with_dep_edge() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("code.db");
    let plan = write_plan(
        dir.path(),
        "plan_id=demo\n\
         - [ ] id=s1 lane=0 payload=@doc:readme\n\
         - [ ] id=s2 lane=0 payload=@doc:followup deps=s1\n",
    );

    let assert = jm().arg("expand").arg(&plan).arg("--db").arg(&db).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.contains("demo"), "stdout was: {stdout}");
    assert!(stdout.contains("2 jobs"), "stdout was: {stdout}");

    let conn = Connection::open(&db).expect("open db");
    let mut stmt = conn.prepare("SELECT id, status FROM jobs ORDER BY id").expect("prepare");
    let rows: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .expect("query")
        .collect::<Result<_, _>>()
        .expect("rows");
    assert_eq!(rows, vec![
        ("demo::s1".to_string(), "queued".to_string()),
        ("demo::s2".to_string(), "queued".to_string()),
    ]);

    let dep_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM job_deps WHERE job_id = ?1 AND dep_id = ?2", ["demo::s2", "demo::s1"], |r| r.get(0))
        .expect("dep count");
    assert_eq!(dep_count, 1);
}

#[test]
fn expand_rejects_plan_with_unknown_dep_and_leaves_store_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("code.db");
    let plan = write_plan(dir.path(), "- [ ] id=s2 lane=0 payload=@doc:b deps=missing\n");

    jm().arg("expand").arg(&plan).arg("--db").arg(&db).assert().failure();

    // The store file may or may not exist depending on how early compilation
    // failed, but if it does, it must hold no job rows.
    if db.exists() {
        let conn = Connection::open(&db).expect("open db");
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM jobs", [], |r| r.get(0)).expect("count");
        assert_eq!(count, 0);
    }
}

#[test]
fn hash_matches_a_raw_sha1_digest_of_the_same_bytes() {
    use sha1::{Digest, Sha1};

    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("payload.txt");
    std::fs::write(&file, b"hello from the scheduler").expect("write");

    let mut hasher = Sha1::new();
    hasher.update(b"hello from the scheduler");
    let expected = format!("{:x}", hasher.finalize());

    let assert = jm().arg("hash").arg(&file).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.starts_with(&expected), "stdout was: {stdout}");
}

#[test]
fn enqueue_rejects_payload_without_a_recognized_prefix() {
    // No server needs to be running: payload validation happens before the
    // HTTP round trip, so this fails fast with a nonzero exit.
    jm().args(["enqueue", "not-a-valid-pointer", "--id", "x", "--port", "1"]).assert().failure();
}

#[test]
#[serial]
fn server_claim_then_done_round_trip_over_http() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("code.db");
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind free port");
        listener.local_addr().expect("addr").port()
    };

    let mut server = jm()
        .args(["server", "--db", db.to_str().expect("utf8"), "--host", "127.0.0.1", "--port"])
        .arg(port.to_string())
        .spawn()
        .expect("spawn server");

    let base = format!("http://127.0.0.1:{port}");
    let http = reqwest::blocking::Client::new();

    let mut healthy = false;
    for _ in 0..40 {
        if http.get(format!("{base}/health")).send().map(|r| r.status().is_success()).unwrap_or(false) {
            healthy = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(150));
    }
    assert!(healthy, "server did not become healthy in time");

    for id in ["a", "b"] {
        let resp = http
            .post(format!("{base}/enqueue"))
            .json(&serde_json::json!({"id": id, "lane": 0, "payload": "@doc:x"}))
            .send()
            .expect("enqueue");
        assert!(resp.status().is_success());
    }

    // FIFO among ready siblings enqueued in order: a then b.
    let first: serde_json::Value =
        http.get(format!("{base}/ready?holder=w1&batch=1")).send().expect("ready1").json().expect("json");
    assert_eq!(first["jobs"][0]["id"], "a");

    let done = http
        .post(format!("{base}/done"))
        .json(&serde_json::json!({"id": "a", "holder": "w1"}))
        .send()
        .expect("done");
    let done: serde_json::Value = done.json().expect("json");
    assert_eq!(done["ok"], true);

    let second: serde_json::Value =
        http.get(format!("{base}/ready?holder=w1&batch=1")).send().expect("ready2").json().expect("json");
    assert_eq!(second["jobs"][0]["id"], "b");

    let stats: serde_json::Value = http.get(format!("{base}/stats")).send().expect("stats").json().expect("json");
    assert_eq!(stats["done"], 1);
    assert_eq!(stats["total"], 2);

    let _ = server.kill();
    let _ = server.wait();
}
