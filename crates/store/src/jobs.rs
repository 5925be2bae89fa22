// SPDX-License-Identifier: MIT

//! Job table operations: insert, ready-selection, conditional transitions,
//! stale-lease sweep, listing and stats.

use jm_core::{HolderId, Job, JobId, JobStatus, Lane};
use rusqlite::{params, OptionalExtension, Row};
use std::collections::HashMap;

use crate::events;
use crate::{Store, StoreError};

fn row_to_job(row: &Row<'_>) -> rusqlite::Result<Job> {
    let status_str: String = row.get("status")?;
    let status = JobStatus::parse(&status_str).unwrap_or(JobStatus::Queued);
    Ok(Job {
        id: JobId::from(row.get::<_, String>("id")?),
        lane: Lane(row.get("lane")?),
        payload: row.get("payload")?,
        status,
        holder: row.get::<_, Option<String>>("holder")?.map(HolderId::from),
        lease_until: row.get("lease_until")?,
        attempts: row.get::<_, i64>("attempts")? as u32,
        max_attempts: row.get::<_, i64>("max_attempts")? as u32,
        dedupe_key: row.get("dedupe_key")?,
        error: row.get("error")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

const JOB_COLUMNS: &str = "id, lane, payload, status, holder, lease_until, created_at, updated_at, error, attempts, max_attempts, dedupe_key";

/// Aggregate counts returned by `stats()`.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Stats {
    pub queued: u64,
    pub running: u64,
    pub done: u64,
    pub failed: u64,
    pub total: u64,
}

impl Store {
    /// Insert a job if `id` is not already present. No-op on duplicate id.
    pub fn insert_job_if_absent(
        &self,
        id: &JobId,
        lane: Lane,
        payload: &str,
        dedupe_key: Option<&str>,
        max_attempts: u32,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO jobs(id, lane, payload, status, created_at, updated_at, dedupe_key, max_attempts)
             VALUES (?1, ?2, ?3, 'queued', ?4, ?4, ?5, ?6)",
            params![id.as_str(), lane.0, payload, now_ms, dedupe_key, max_attempts],
        )
        .map_err(StoreError::from_rusqlite)?;
        events::append_event(&conn, now_ms, Some(id), jm_core::EventKind::Enqueued, payload)?;
        Ok(())
    }

    /// Select up to `limit` ready jobs (queued, every dep done), oldest
    /// first by `created_at`, ties broken by id.
    pub fn select_ready(&self, lane: Option<Lane>, limit: u32) -> Result<Vec<Job>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM jobs j
             WHERE j.status = 'queued'
               {lane_clause}
               AND NOT EXISTS (
                   SELECT 1 FROM job_deps d
                   JOIN jobs dj ON dj.id = d.dep_id
                   WHERE d.job_id = j.id AND dj.status != 'done'
               )
             ORDER BY j.created_at ASC, j.id ASC
             LIMIT ?{limit_idx}",
            lane_clause = if lane.is_some() { "AND j.lane = ?1" } else { "" },
            limit_idx = if lane.is_some() { 2 } else { 1 },
        );
        let mut stmt = conn.prepare(&sql).map_err(StoreError::from_rusqlite)?;
        let rows = if let Some(lane) = lane {
            stmt.query_map(params![lane.0, limit], row_to_job)
        } else {
            stmt.query_map(params![limit], row_to_job)
        }
        .map_err(StoreError::from_rusqlite)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(StoreError::from_rusqlite)?);
        }
        Ok(out)
    }

    /// Succeeds only if `status='queued'`; increments `attempts` and stamps
    /// `holder`/`lease_until`. Returns whether a row was actually updated —
    /// `false` means another worker won the race.
    pub fn conditional_update_to_running(
        &self,
        id: &JobId,
        holder: &HolderId,
        lease_until_ms: i64,
        now_ms: i64,
    ) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let n = conn
            .execute(
                "UPDATE jobs SET status='running', holder=?1, lease_until=?2, attempts=attempts+1, updated_at=?3
                 WHERE id=?4 AND status='queued'",
                params![holder.as_str(), lease_until_ms, now_ms, id.as_str()],
            )
            .map_err(StoreError::from_rusqlite)?;
        if n > 0 {
            events::append_event(
                &conn,
                now_ms,
                Some(id),
                jm_core::EventKind::Claimed,
                &format!("holder={}", holder.as_str()),
            )?;
        }
        Ok(n > 0)
    }

    /// Dedupe short-circuit: move a still-`queued` job straight to `done`
    /// without ever passing through `running`. `attempts` is left at 0.
    pub fn mark_dedupe_done(
        &self,
        id: &JobId,
        holder: &HolderId,
        dedupe_key: &str,
        now_ms: i64,
    ) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let n = conn
            .execute(
                "UPDATE jobs SET status='done', holder=?1, updated_at=?2 WHERE id=?3 AND status='queued'",
                params![holder.as_str(), now_ms, id.as_str()],
            )
            .map_err(StoreError::from_rusqlite)?;
        if n > 0 {
            events::append_event(
                &conn,
                now_ms,
                Some(id),
                jm_core::EventKind::DedupeSkip,
                &format!("artifact exists for {dedupe_key}"),
            )?;
        }
        Ok(n > 0)
    }

    /// Succeeds only if `status='running'` and (when given) `holder`
    /// matches.
    pub fn conditional_update_to_done(
        &self,
        id: &JobId,
        holder: Option<&HolderId>,
        now_ms: i64,
    ) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let n = match holder {
            Some(h) => conn
                .execute(
                    "UPDATE jobs SET status='done', updated_at=?1 WHERE id=?2 AND status='running' AND holder=?3",
                    params![now_ms, id.as_str(), h.as_str()],
                )
                .map_err(StoreError::from_rusqlite)?,
            None => conn
                .execute(
                    "UPDATE jobs SET status='done', updated_at=?1 WHERE id=?2 AND status='running'",
                    params![now_ms, id.as_str()],
                )
                .map_err(StoreError::from_rusqlite)?,
        };
        if n > 0 {
            events::append_event(&conn, now_ms, Some(id), jm_core::EventKind::Done, "")?;
        }
        Ok(n > 0)
    }

    /// Same guard as [`Store::conditional_update_to_done`]. `error` is
    /// truncated to 1000 chars before being stored.
    pub fn conditional_update_to_failed(
        &self,
        id: &JobId,
        error: &str,
        holder: Option<&HolderId>,
        now_ms: i64,
    ) -> Result<bool, StoreError> {
        let truncated: String = error.chars().take(1000).collect();
        let conn = self.conn()?;
        let n = match holder {
            Some(h) => conn
                .execute(
                    "UPDATE jobs SET status='failed', error=?1, updated_at=?2 WHERE id=?3 AND status='running' AND holder=?4",
                    params![truncated, now_ms, id.as_str(), h.as_str()],
                )
                .map_err(StoreError::from_rusqlite)?,
            None => conn
                .execute(
                    "UPDATE jobs SET status='failed', error=?1, updated_at=?2 WHERE id=?3 AND status='running'",
                    params![truncated, now_ms, id.as_str()],
                )
                .map_err(StoreError::from_rusqlite)?,
        };
        if n > 0 {
            let msg: String = truncated.chars().take(200).collect();
            events::append_event(&conn, now_ms, Some(id), jm_core::EventKind::Failed, &msg)?;
        }
        Ok(n > 0)
    }

    /// Succeeds only if `status='running'` and `holder` matches.
    pub fn conditional_heartbeat(
        &self,
        id: &JobId,
        holder: &HolderId,
        new_lease_until_ms: i64,
        now_ms: i64,
    ) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let n = conn
            .execute(
                "UPDATE jobs SET lease_until=?1, updated_at=?2 WHERE id=?3 AND status='running' AND holder=?4",
                params![new_lease_until_ms, now_ms, id.as_str(), holder.as_str()],
            )
            .map_err(StoreError::from_rusqlite)?;
        Ok(n > 0)
    }

    /// Every `running` job whose lease has expired as of `now_ms`.
    pub fn scan_stale(&self, now_ms: i64) -> Result<Vec<Job>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE status='running' AND lease_until < ?1"
        );
        let mut stmt = conn.prepare(&sql).map_err(StoreError::from_rusqlite)?;
        let rows = stmt
            .query_map(params![now_ms], row_to_job)
            .map_err(StoreError::from_rusqlite)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(StoreError::from_rusqlite)?);
        }
        Ok(out)
    }

    /// Requeue (or fail, past the attempt cap) every stale-leased job.
    /// Runs inside an immediate transaction so two concurrent claimers
    /// never both try to requeue the same job.
    pub fn requeue_stale(&self, now_ms: i64) -> Result<usize, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
            .map_err(StoreError::from_rusqlite)?;

        let stale: Vec<(String, i64, i64)> = {
            let mut stmt = tx
                .prepare("SELECT id, attempts, max_attempts FROM jobs WHERE status='running' AND lease_until < ?1")
                .map_err(StoreError::from_rusqlite)?;
            let rows = stmt
                .query_map(params![now_ms], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
                })
                .map_err(StoreError::from_rusqlite)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row.map_err(StoreError::from_rusqlite)?);
            }
            out
        };

        for (id, attempts, max_attempts) in &stale {
            if attempts < max_attempts {
                tx.execute(
                    "UPDATE jobs SET status='queued', holder=NULL, lease_until=NULL, updated_at=?1 WHERE id=?2",
                    params![now_ms, id],
                )
                .map_err(StoreError::from_rusqlite)?;
                events::append_event(
                    &tx,
                    now_ms,
                    Some(&JobId::from(id.clone())),
                    jm_core::EventKind::Requeued,
                    "stale lease",
                )?;
            } else {
                tx.execute(
                    "UPDATE jobs SET status='failed', error='max attempts exceeded', updated_at=?1 WHERE id=?2",
                    params![now_ms, id],
                )
                .map_err(StoreError::from_rusqlite)?;
                events::append_event(
                    &tx,
                    now_ms,
                    Some(&JobId::from(id.clone())),
                    jm_core::EventKind::Failed,
                    "max attempts exceeded",
                )?;
            }
        }

        tx.commit().map_err(StoreError::from_rusqlite)?;
        Ok(stale.len())
    }

    /// Counts per status, plus total.
    pub fn stats(&self) -> Result<Stats, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT status, COUNT(*) FROM jobs GROUP BY status")
            .map_err(StoreError::from_rusqlite)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))
            .map_err(StoreError::from_rusqlite)?;
        let mut by_status: HashMap<String, u64> = HashMap::new();
        for row in rows {
            let (status, count) = row.map_err(StoreError::from_rusqlite)?;
            by_status.insert(status, count);
        }
        let mut stats = Stats {
            queued: by_status.get("queued").copied().unwrap_or(0),
            running: by_status.get("running").copied().unwrap_or(0),
            done: by_status.get("done").copied().unwrap_or(0),
            failed: by_status.get("failed").copied().unwrap_or(0),
            total: 0,
        };
        stats.total = stats.queued + stats.running + stats.done + stats.failed;
        Ok(stats)
    }

    /// List jobs, optionally filtered by status, oldest-first, bounded by
    /// `limit`.
    pub fn list_jobs(&self, status: Option<JobStatus>, limit: u32) -> Result<Vec<Job>, StoreError> {
        let conn = self.conn()?;
        match status {
            Some(status) => {
                let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE status=?1 ORDER BY created_at LIMIT ?2");
                let mut stmt = conn.prepare(&sql).map_err(StoreError::from_rusqlite)?;
                let rows = stmt
                    .query_map(params![status.to_string(), limit], row_to_job)
                    .map_err(StoreError::from_rusqlite)?;
                rows.map(|r| r.map_err(StoreError::from_rusqlite)).collect()
            }
            None => {
                let sql = format!("SELECT {JOB_COLUMNS} FROM jobs ORDER BY created_at LIMIT ?1");
                let mut stmt = conn.prepare(&sql).map_err(StoreError::from_rusqlite)?;
                let rows = stmt
                    .query_map(params![limit], row_to_job)
                    .map_err(StoreError::from_rusqlite)?;
                rows.map(|r| r.map_err(StoreError::from_rusqlite)).collect()
            }
        }
    }

    /// Fetch a single job by id, if present.
    pub fn get_job(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id=?1");
        conn.query_row(&sql, params![id.as_str()], row_to_job)
            .optional()
            .map_err(StoreError::from_rusqlite)
    }
}
