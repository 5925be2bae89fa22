// SPDX-License-Identifier: MIT

//! Batch application of a compiled plan: every job insert and dep insert
//! lands in one transaction, so a partially-valid plan never leaves a
//! partial job set behind.

use jm_core::{EventKind, JobId, Lane};
use rusqlite::params;

use crate::{events, Store, StoreError};

/// One job to insert, as produced by the plan compiler.
pub struct PlanJob<'a> {
    pub id: &'a JobId,
    pub lane: Lane,
    pub payload: &'a str,
    pub dedupe_key: Option<&'a str>,
    pub max_attempts: u32,
}

/// One dependency edge to insert, as produced by the plan compiler.
pub struct PlanDep<'a> {
    pub job_id: &'a JobId,
    pub dep_id: &'a JobId,
}

impl Store {
    /// Insert every job then every dep edge inside a single transaction.
    pub fn apply_plan(
        &self,
        jobs: &[PlanJob<'_>],
        deps: &[PlanDep<'_>],
        now_ms: i64,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(StoreError::from_rusqlite)?;

        for job in jobs {
            tx.execute(
                "INSERT OR IGNORE INTO jobs(id, lane, payload, status, created_at, updated_at, dedupe_key, max_attempts)
                 VALUES (?1, ?2, ?3, 'queued', ?4, ?4, ?5, ?6)",
                params![job.id.as_str(), job.lane.0, job.payload, now_ms, job.dedupe_key, job.max_attempts],
            )
            .map_err(StoreError::from_rusqlite)?;
            events::append_event(&tx, now_ms, Some(job.id), EventKind::Enqueued, job.payload)?;
        }

        for dep in deps {
            tx.execute(
                "INSERT OR IGNORE INTO job_deps(job_id, dep_id) VALUES (?1, ?2)",
                params![dep.job_id.as_str(), dep.dep_id.as_str()],
            )
            .map_err(StoreError::from_rusqlite)?;
        }

        tx.commit().map_err(StoreError::from_rusqlite)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jm_core::JobId;

    #[test]
    fn apply_plan_inserts_jobs_and_deps_together() {
        let store = Store::open_in_memory().expect("open");
        let a = JobId::new("p::a");
        let b = JobId::new("p::b");
        let jobs = vec![
            PlanJob { id: &a, lane: Lane(0), payload: "@doc:a", dedupe_key: None, max_attempts: 3 },
            PlanJob { id: &b, lane: Lane(0), payload: "@doc:b", dedupe_key: None, max_attempts: 3 },
        ];
        let deps = vec![PlanDep { job_id: &b, dep_id: &a }];

        store.apply_plan(&jobs, &deps, 1000).expect("apply");

        let jobs = store.list_jobs(None, 10).expect("list");
        assert_eq!(jobs.len(), 2);
        assert_eq!(store.deps_of(&b).expect("deps"), vec![a]);
    }

    #[test]
    fn apply_plan_is_idempotent_on_replay() {
        let store = Store::open_in_memory().expect("open");
        let a = JobId::new("p::a");
        let jobs = vec![PlanJob { id: &a, lane: Lane(0), payload: "@doc:a", dedupe_key: None, max_attempts: 3 }];

        store.apply_plan(&jobs, &[], 1000).expect("apply1");
        store.apply_plan(&jobs, &[], 2000).expect("apply2");

        let listed = store.list_jobs(None, 10).expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].created_at, 1000);
    }
}
