// SPDX-License-Identifier: MIT

//! jm-store: the durable store.
//!
//! A single local SQLite file in WAL mode, opened through an `r2d2`
//! connection pool so concurrent readers (HTTP handlers, CLI queries) don't
//! block behind the scheduler's writers. Every mutating operation is a
//! short, conditionally-guarded statement rather than a long-held
//! transaction, matching the spec's "serialize writers with a busy-timeout"
//! requirement rather than a single global lock.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod deps;
mod error;
mod events;
mod jobs;
mod plan;
mod schema;

pub use error::StoreError;
pub use jobs::Stats;
pub use plan::{PlanDep, PlanJob};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::time::Duration;

/// Busy-timeout applied to every connection in the pool (spec: "≥5 s").
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) type PooledConn = r2d2::PooledConnection<SqliteConnectionManager>;

/// Handle to the durable store. Cheap to clone (it wraps a pool `Arc`).
#[derive(Clone)]
pub struct Store {
    pool: Pool<SqliteConnectionManager>,
}

impl Store {
    /// Open (creating if absent) the SQLite file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            Ok(())
        });
        let pool = Pool::builder().build(manager)?;

        let store = Self { pool };
        store.migrate()?;
        Ok(store)
    }

    /// Open a private, non-shared in-memory store. Only useful for tests:
    /// each pooled connection would otherwise see its own empty database,
    /// so the pool is capped at a single connection here.
    #[doc(hidden)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            Ok(())
        });
        let pool = Pool::builder().max_size(1).build(manager)?;
        let store = Self { pool };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute_batch(schema::SCHEMA)?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> Result<PooledConn, StoreError> {
        self.pool.get().map_err(StoreError::from)
    }
}
