// SPDX-License-Identifier: MIT

//! Schema migration. A single forward-only `CREATE TABLE IF NOT EXISTS`
//! script; the event log's unbounded growth is a known follow-up (no
//! retention policy yet — see DESIGN.md).

pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id           TEXT PRIMARY KEY,
    lane         INTEGER NOT NULL DEFAULT 0,
    payload      TEXT NOT NULL,
    status       TEXT NOT NULL DEFAULT 'queued',
    holder       TEXT,
    lease_until  INTEGER,
    created_at   INTEGER NOT NULL,
    updated_at   INTEGER NOT NULL,
    error        TEXT,
    attempts     INTEGER NOT NULL DEFAULT 0,
    max_attempts INTEGER NOT NULL DEFAULT 3,
    dedupe_key   TEXT
);

CREATE TABLE IF NOT EXISTS job_deps (
    job_id TEXT NOT NULL,
    dep_id TEXT NOT NULL,
    PRIMARY KEY (job_id, dep_id),
    FOREIGN KEY (job_id) REFERENCES jobs(id),
    FOREIGN KEY (dep_id) REFERENCES jobs(id)
);

CREATE TABLE IF NOT EXISTS events (
    ts_ms  INTEGER NOT NULL,
    job_id TEXT,
    kind   TEXT NOT NULL,
    msg    TEXT
);

CREATE INDEX IF NOT EXISTS idx_jobs_status  ON jobs(status);
CREATE INDEX IF NOT EXISTS idx_jobs_lane    ON jobs(lane);
CREATE INDEX IF NOT EXISTS idx_jobs_dedupe  ON jobs(dedupe_key);
CREATE INDEX IF NOT EXISTS idx_job_deps_dep ON job_deps(dep_id);
CREATE INDEX IF NOT EXISTS idx_events_job   ON events(job_id);
"#;
