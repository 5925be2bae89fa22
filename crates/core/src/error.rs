// SPDX-License-Identifier: MIT

//! Error kinds shared by the store, scheduler, compiler and HTTP layers.

use thiserror::Error;

/// Errors surfaced by scheduler operations.
///
/// Validation errors ([`SchedulerError::BadPayload`], [`SchedulerError::UnknownDep`],
/// [`SchedulerError::OrphanIdeas`]) never mutate state. Everything else reflects
/// a store- or execution-level failure.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Payload prefix is not in the recognized set.
    #[error("payload must start with one of @file:, @cmd:, @url:, @git:, @gh:, @doc: (got {0:?})")]
    BadPayload(String),

    /// A plan step's `deps` referenced a step id that was never defined.
    #[error("step {step} depends on unknown step {dep}")]
    UnknownDep { step: String, dep: String },

    /// `accrue_all_ideas=true` but the plan still has TODO_ORPHAN markers.
    #[error("accrue_all_ideas policy active but {count} TODO_ORPHAN marker(s) found")]
    OrphanIdeas { count: usize },

    /// The plan document had no step lines at all.
    #[error("no steps found in plan")]
    EmptyPlan,

    /// Store contention exceeded the busy-timeout.
    #[error("store busy: {0}")]
    StoreBusy(String),

    /// Underlying store I/O or driver error.
    #[error("store error: {0}")]
    Store(String),

    /// Underlying filesystem I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchedulerError {
    /// HTTP status code this error kind maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            SchedulerError::BadPayload(_)
            | SchedulerError::UnknownDep { .. }
            | SchedulerError::OrphanIdeas { .. }
            | SchedulerError::EmptyPlan => 400,
            _ => 500,
        }
    }
}
