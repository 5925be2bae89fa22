// SPDX-License-Identifier: MIT

//! Job identifier and state machine.

use crate::ids::{HolderId, JobId, Lane};
use serde::{Deserialize, Serialize};

/// Status of a job. See the invariants in the crate-level docs: `running`
/// implies `holder` and `lease_until` are both set, and `done`/`failed` are
/// terminal — the scheduler never transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
}

crate::simple_display! {
    JobStatus {
        Queued => "queued",
        Running => "running",
        Done => "done",
        Failed => "failed",
    }
}

impl JobStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobStatus::Queued),
            "running" => Some(JobStatus::Running),
            "done" => Some(JobStatus::Done),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// `done` and `failed` are terminal: the scheduler never moves a job
    /// out of them. External re-enqueue as a new id is permitted, but that
    /// is the caller's business, not this state machine's.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

/// A unit of work tracked by the durable store.
///
/// Mirrors the `jobs` table row-for-row; the store is the source of truth,
/// this struct is the typed view the scheduler and HTTP layers operate on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub lane: Lane,
    pub payload: String,
    pub status: JobStatus,
    pub holder: Option<HolderId>,
    pub lease_until: Option<i64>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub dedupe_key: Option<String>,
    pub error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Job {
    /// True iff invariant 1 holds for this row: `running` implies a holder
    /// and a lease, and nothing else does.
    pub fn holder_invariant_holds(&self) -> bool {
        match self.status {
            JobStatus::Running => self.holder.is_some() && self.lease_until.is_some(),
            _ => self.holder.is_none() == self.lease_until.is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn status_parses_round_trip() {
        for s in [JobStatus::Queued, JobStatus::Running, JobStatus::Done, JobStatus::Failed] {
            let text = s.to_string();
            assert_eq!(JobStatus::parse(&text), Some(s));
        }
    }

    fn sample(status: JobStatus, holder: Option<&str>, lease_until: Option<i64>) -> Job {
        Job {
            id: JobId::new("p::s"),
            lane: Lane(0),
            payload: "@doc:readme".into(),
            status,
            holder: holder.map(HolderId::new),
            lease_until,
            attempts: 0,
            max_attempts: 3,
            dedupe_key: None,
            error: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn invariant_holds_for_running_with_holder_and_lease() {
        assert!(sample(JobStatus::Running, Some("w1"), Some(100)).holder_invariant_holds());
    }

    #[test]
    fn invariant_violated_for_running_without_holder() {
        assert!(!sample(JobStatus::Running, None, Some(100)).holder_invariant_holds());
    }

    #[test]
    fn invariant_holds_for_queued_without_holder() {
        assert!(sample(JobStatus::Queued, None, None).holder_invariant_holds());
    }
}
