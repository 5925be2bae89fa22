// SPDX-License-Identifier: MIT

//! Identifier newtypes.
//!
//! `JobId` and `HolderId` are thin wrappers over [`SmolStr`] rather than
//! fixed-size buffers: job ids are compiler-produced (`plan_id::step_id`)
//! and can legitimately run longer than a short inline id would allow.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// Unique identifier for a job, either user-supplied or
/// `<plan_id>::<step_id>` as produced by the plan compiler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(SmolStr);

impl JobId {
    pub fn new(s: impl Into<SmolStr>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(SmolStr::from(s))
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(SmolStr::from(s))
    }
}

impl std::borrow::Borrow<str> for JobId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

/// Identifier of the worker that currently (or most recently) holds a
/// job's lease. The scheduler never parses this string; it is a bare
/// equality key used by the conditional-update guards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HolderId(SmolStr);

impl HolderId {
    pub fn new(s: impl Into<SmolStr>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for HolderId {
    fn from(s: String) -> Self {
        Self(SmolStr::from(s))
    }
}

impl From<&str> for HolderId {
    fn from(s: &str) -> Self {
        Self(SmolStr::from(s))
    }
}

/// Opaque routing tag. Lane is not a priority: workers self-select by
/// equality, there is no fair-share or ordering between lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lane(pub i64);

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Lane {
    fn from(v: i64) -> Self {
        Lane(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_round_trips_through_serde() {
        let id = JobId::new("plan::step-1");
        let json = serde_json::to_string(&id).expect("serialize");
        let back: JobId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, back);
    }

    #[test]
    fn job_id_borrows_as_str_for_map_lookups() {
        use std::collections::HashMap;
        let mut map: HashMap<JobId, u32> = HashMap::new();
        map.insert(JobId::new("a::b"), 1);
        assert_eq!(map.get("a::b"), Some(&1));
    }
}
