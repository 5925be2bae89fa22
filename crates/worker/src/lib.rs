// SPDX-License-Identifier: MIT

//! jm-worker: the worker runtime. Polls the HTTP control plane, dispatches
//! claimed jobs to local execution, and reports outcomes back.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod client;
pub mod dispatch;
pub mod exec;
pub mod runtime;
pub mod safety;

pub use client::{ApiClient, ClientError};
pub use dispatch::{execute_job_local, execute_job_local_with_lease, execute_job_local_with_timeout};
pub use runtime::{worker_loop, WorkerConfig, WorkerMode};
pub use safety::is_cmd_safe;
