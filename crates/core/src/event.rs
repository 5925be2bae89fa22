// SPDX-License-Identifier: MIT

//! Append-only audit event. Never read back by the scheduler itself —
//! events exist for operators and for the `events` table's own sake.

use crate::ids::JobId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Enqueued,
    Claimed,
    Done,
    Failed,
    Requeued,
    DedupeSkip,
}

crate::simple_display! {
    EventKind {
        Enqueued => "enqueued",
        Claimed => "claimed",
        Done => "done",
        Failed => "failed",
        Requeued => "requeued",
        DedupeSkip => "dedupe_skip",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub ts_ms: i64,
    pub job_id: Option<JobId>,
    pub kind: EventKind,
    pub msg: String,
}
