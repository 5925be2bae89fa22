// SPDX-License-Identifier: MIT

//! Append-only event log, used for both audit trail and CLI `jobs --events`
//! style inspection. Never read back by the scheduler itself.

use jm_core::{EventKind, JobId};
use rusqlite::{params, Connection};

use crate::StoreError;

/// Truncation applied to free-form event messages — generous enough to
/// keep a useful excerpt without letting one runaway message bloat the
/// log table.
const MAX_MSG_LEN: usize = 500;

pub(crate) fn append_event(
    conn: &Connection,
    ts_ms: i64,
    job_id: Option<&JobId>,
    kind: EventKind,
    msg: &str,
) -> Result<(), StoreError> {
    let truncated: String = msg.chars().take(MAX_MSG_LEN).collect();
    conn.execute(
        "INSERT INTO events(ts_ms, job_id, kind, msg) VALUES (?1, ?2, ?3, ?4)",
        params![ts_ms, job_id.map(JobId::as_str), kind.to_string(), truncated],
    )
    .map_err(StoreError::from_rusqlite)?;
    Ok(())
}
