// SPDX-License-Identifier: MIT

//! Dependency-edge table operations.

use jm_core::JobId;
use rusqlite::params;

use crate::{Store, StoreError};

impl Store {
    /// Record that `job_id` depends on `dep_id`. Idempotent: re-inserting
    /// the same edge is a no-op. Self-edges are rejected by the caller
    /// (the scheduler), not here — the store layer just persists edges.
    pub fn insert_dep_if_absent(&self, job_id: &JobId, dep_id: &JobId) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO job_deps(job_id, dep_id) VALUES (?1, ?2)",
            params![job_id.as_str(), dep_id.as_str()],
        )
        .map_err(StoreError::from_rusqlite)?;
        Ok(())
    }

    /// All dep ids recorded for `job_id`.
    pub fn deps_of(&self, job_id: &JobId) -> Result<Vec<JobId>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT dep_id FROM job_deps WHERE job_id=?1")
            .map_err(StoreError::from_rusqlite)?;
        let rows = stmt
            .query_map(params![job_id.as_str()], |row| row.get::<_, String>(0))
            .map_err(StoreError::from_rusqlite)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(JobId::from(row.map_err(StoreError::from_rusqlite)?));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    #[test]
    fn dep_on_a_job_that_was_never_enqueued_is_rejected() {
        let store = Store::open_in_memory().expect("open");
        store
            .insert_job_if_absent(&JobId::new("a"), jm_core::Lane(0), "@doc:a", None, 3, 0)
            .expect("insert a");
        let err = store.insert_dep_if_absent(&JobId::new("a"), &JobId::new("ghost")).unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[test]
    fn dep_between_two_existing_jobs_is_accepted() {
        let store = Store::open_in_memory().expect("open");
        store.insert_job_if_absent(&JobId::new("a"), jm_core::Lane(0), "@doc:a", None, 3, 0).expect("insert a");
        store.insert_job_if_absent(&JobId::new("b"), jm_core::Lane(0), "@doc:b", None, 3, 0).expect("insert b");
        store.insert_dep_if_absent(&JobId::new("b"), &JobId::new("a")).expect("insert dep");
        assert_eq!(store.deps_of(&JobId::new("b")).expect("deps"), vec![JobId::new("a")]);
    }
}
