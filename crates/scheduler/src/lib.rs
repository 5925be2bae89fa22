// SPDX-License-Identifier: MIT

//! jm-scheduler: the business logic sitting between the HTTP control plane
//! and the durable store.
//!
//! Every public method here corresponds to one scheduler-core operation:
//! enqueue, claim, heartbeat, mark-done, mark-failed, requeue-stale. None of
//! them touch the filesystem directly except through [`ArtifactIndex`] for
//! dedupe lookups — everything else goes through [`jm_store::Store`].

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod artifacts;

pub use artifacts::ArtifactIndex;

use jm_core::{validate_payload, Clock, HolderId, Job, JobId, Lane, SchedulerError};
use jm_store::Store;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default lease window, in milliseconds, when a caller does not specify
/// one.
pub const DEFAULT_LEASE_MS: i64 = 90_000;

/// A dependency edge to be inserted alongside a newly enqueued job.
pub type DepRef<'a> = &'a str;

#[derive(Clone)]
pub struct Scheduler {
    store: Store,
    artifacts: ArtifactIndex,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn new(store: Store, artifacts: ArtifactIndex, clock: Arc<dyn Clock>) -> Self {
        Self { store, artifacts, clock }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Insert a job (no-op if `id` already exists) and its dependency
    /// edges. Fails validation before touching the store.
    pub fn enqueue(
        &self,
        id: &JobId,
        lane: Lane,
        payload: &str,
        deps: &[DepRef<'_>],
        dedupe_key: Option<&str>,
        max_attempts: Option<u32>,
    ) -> Result<(), SchedulerError> {
        validate_payload(payload)?;
        let now = self.clock.now_ms();
        self.store
            .insert_job_if_absent(id, lane, payload, dedupe_key, max_attempts.unwrap_or(3), now)
            .map_err(store_err)?;
        for dep in deps {
            self.store
                .insert_dep_if_absent(id, &JobId::from(*dep))
                .map_err(store_err)?;
        }
        Ok(())
    }

    /// The central claim algorithm: sweep stale leases, select ready jobs,
    /// then try to claim each in turn (dedupe short-circuit first).
    pub fn claim(
        &self,
        holder: &HolderId,
        lane: Option<Lane>,
        batch: u32,
        lease_ms: i64,
    ) -> Result<Vec<Job>, SchedulerError> {
        let now = self.clock.now_ms();
        let requeued = self.store.requeue_stale(now).map_err(store_err)?;
        if requeued > 0 {
            debug!(requeued, "stale-lease sweep requeued jobs");
        }

        let candidates = self.store.select_ready(lane, batch).map_err(store_err)?;
        let mut claimed = Vec::with_capacity(candidates.len() as usize);

        for candidate in candidates {
            if claimed.len() as u32 >= batch {
                break;
            }
            if let Some(dedupe_key) = candidate.dedupe_key.as_deref() {
                if self.artifacts.contains(dedupe_key) {
                    let now = self.clock.now_ms();
                    self.store
                        .mark_dedupe_done(&candidate.id, holder, dedupe_key, now)
                        .map_err(store_err)?;
                    continue;
                }
            }

            let now = self.clock.now_ms();
            let lease_until = now + lease_ms;
            let ok = self
                .store
                .conditional_update_to_running(&candidate.id, holder, lease_until, now)
                .map_err(store_err)?;
            if !ok {
                continue;
            }
            let mut job = candidate;
            job.status = jm_core::JobStatus::Running;
            job.holder = Some(holder.clone());
            job.lease_until = Some(lease_until);
            job.attempts += 1;
            claimed.push(job);
        }

        Ok(claimed)
    }

    /// Extend a held lease. `false` means the job was already reclaimed or
    /// terminated — the caller must abandon its work.
    pub fn heartbeat(&self, id: &JobId, holder: &HolderId, lease_ms: i64) -> Result<bool, SchedulerError> {
        let now = self.clock.now_ms();
        let ok = self
            .store
            .conditional_heartbeat(id, holder, now + lease_ms, now)
            .map_err(store_err)?;
        if !ok {
            warn!(job = %id, holder = %holder, "heartbeat rejected, lease no longer held");
        }
        Ok(ok)
    }

    /// Mark a job done. A `false` return means the job's fate was already
    /// decided (reclaimed, already terminal) — silently ignorable by the
    /// caller, per the spec's `StaleLease` semantics.
    pub fn mark_done(&self, id: &JobId, holder: Option<&HolderId>) -> Result<bool, SchedulerError> {
        let now = self.clock.now_ms();
        self.store.conditional_update_to_done(id, holder, now).map_err(store_err)
    }

    /// Mark a job failed; `error` is truncated to 1000 chars by the store.
    pub fn mark_failed(
        &self,
        id: &JobId,
        error: &str,
        holder: Option<&HolderId>,
    ) -> Result<bool, SchedulerError> {
        let now = self.clock.now_ms();
        self.store
            .conditional_update_to_failed(id, error, holder, now)
            .map_err(store_err)
    }

    /// Run the stale-lease sweep on its own, outside a claim call. Exposed
    /// mainly for the HTTP `/stats`-adjacent diagnostics and for tests.
    pub fn requeue_stale(&self) -> Result<usize, SchedulerError> {
        let now = self.clock.now_ms();
        self.store.requeue_stale(now).map_err(store_err)
    }

    pub fn stats(&self) -> Result<jm_store::Stats, SchedulerError> {
        self.store.stats().map_err(store_err)
    }

    pub fn list_jobs(
        &self,
        status: Option<jm_core::JobStatus>,
        limit: u32,
    ) -> Result<Vec<Job>, SchedulerError> {
        self.store.list_jobs(status, limit).map_err(store_err)
    }

    pub fn get_job(&self, id: &JobId) -> Result<Option<Job>, SchedulerError> {
        self.store.get_job(id).map_err(store_err)
    }
}

fn store_err(e: jm_store::StoreError) -> SchedulerError {
    match e {
        jm_store::StoreError::Busy(msg) => SchedulerError::StoreBusy(msg),
        other => SchedulerError::Store(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jm_core::FakeClock;

    fn scheduler() -> (Scheduler, tempfile::TempDir) {
        let store = Store::open_in_memory().expect("open");
        let dir = tempfile::tempdir().expect("tempdir");
        let artifacts = ArtifactIndex::new(dir.path());
        let clock = Arc::new(FakeClock::default());
        (Scheduler::new(store, artifacts, clock), dir)
    }

    #[test]
    fn enqueue_rejects_bad_payload_prefix() {
        let (sched, _dir) = scheduler();
        let err = sched
            .enqueue(&JobId::new("p::s1"), Lane(0), "garbage", &[], None, None)
            .unwrap_err();
        assert!(matches!(err, SchedulerError::BadPayload(_)));
    }

    #[test]
    fn s1_fifo_among_ready_siblings() {
        let (sched, _dir) = scheduler();
        sched.enqueue(&JobId::new("a"), Lane(0), "@doc:a", &[], None, None).expect("enqueue a");
        sched.enqueue(&JobId::new("b"), Lane(0), "@doc:b", &[], None, None).expect("enqueue b");

        let holder = HolderId::new("w1");
        let first = sched.claim(&holder, None, 1, 90_000).expect("claim1");
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, JobId::new("a"));

        let second = sched.claim(&holder, None, 1, 90_000).expect("claim2");
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, JobId::new("b"));
    }

    #[test]
    fn s2_dep_gating() {
        let (sched, _dir) = scheduler();
        sched.enqueue(&JobId::new("a"), Lane(0), "@doc:a", &[], None, None).expect("enqueue a");
        sched.enqueue(&JobId::new("b"), Lane(0), "@doc:b", &["a"], None, None).expect("enqueue b");

        let holder = HolderId::new("w1");
        let ready = sched.claim(&holder, None, 10, 90_000).expect("claim");
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, JobId::new("a"));

        sched.mark_done(&JobId::new("a"), Some(&holder)).expect("done");
        let ready = sched.claim(&holder, None, 10, 90_000).expect("claim2");
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, JobId::new("b"));
    }

    #[test]
    fn s3_concurrent_claim_exclusive() {
        let (sched, _dir) = scheduler();
        sched.enqueue(&JobId::new("j"), Lane(0), "@doc:j", &[], None, None).expect("enqueue");

        let w1 = HolderId::new("w1");
        let w2 = HolderId::new("w2");
        let a = sched.claim(&w1, None, 1, 90_000).expect("claim1");
        let b = sched.claim(&w2, None, 1, 90_000).expect("claim2");
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 0);
    }

    #[test]
    fn s4_stale_lease_requeue_with_retry_cap() {
        let store = Store::open_in_memory().expect("open");
        let clock = Arc::new(FakeClock::new(1_000_000));
        let sched = Scheduler::new(store, ArtifactIndex::new("/nonexistent"), clock.clone());
        sched
            .enqueue(&JobId::new("j"), Lane(0), "@doc:j", &[], None, Some(2))
            .expect("enqueue");

        let w1 = HolderId::new("w1");
        let claimed = sched.claim(&w1, None, 1, 1_000).expect("claim1");
        assert_eq!(claimed[0].attempts, 1);

        // W1 dies without heartbeating; advance past the lease and sweep.
        clock.advance_ms(5_000);
        let w2 = HolderId::new("w2");
        let reclaimed = sched.claim(&w2, None, 1, 1_000).expect("claim2");
        assert_eq!(reclaimed.len(), 1);
        assert_eq!(reclaimed[0].attempts, 2);

        // W2 also dies; attempts is already at the cap, so the next sweep fails the job.
        clock.advance_ms(5_000);
        let nobody = HolderId::new("w3");
        let none = sched.claim(&nobody, None, 1, 1_000).expect("claim3");
        assert_eq!(none.len(), 0);

        let job = sched.get_job(&JobId::new("j")).expect("get").expect("present");
        assert_eq!(job.status, jm_core::JobStatus::Failed);
    }

    #[test]
    fn s5_dedupe_short_circuit() {
        let (sched, dir) = scheduler();
        std::fs::write(dir.path().join("abc123"), b"done already").expect("write artifact");
        sched
            .enqueue(&JobId::new("j"), Lane(0), "@file:out.txt", &[], Some("abc123"), None)
            .expect("enqueue");

        let holder = HolderId::new("w1");
        let claimed = sched.claim(&holder, None, 10, 90_000).expect("claim");
        assert!(claimed.is_empty(), "deduped job must not be returned to the worker");

        let job = sched.get_job(&JobId::new("j")).expect("get").expect("present");
        assert_eq!(job.status, jm_core::JobStatus::Done);
        assert_eq!(job.attempts, 0);
    }

    #[test]
    fn heartbeat_fails_once_lease_is_reclaimed() {
        let (sched, _dir) = scheduler();
        sched.enqueue(&JobId::new("j"), Lane(0), "@doc:j", &[], None, None).expect("enqueue");
        let w1 = HolderId::new("w1");
        sched.claim(&w1, None, 1, 90_000).expect("claim");

        let w2 = HolderId::new("w2");
        assert!(!sched.heartbeat(&JobId::new("j"), &w2, 30_000).expect("heartbeat"));
        assert!(sched.heartbeat(&JobId::new("j"), &w1, 30_000).expect("heartbeat"));
    }
}
