// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors from the durable store.
///
/// `Busy` is the only one callers are expected to retry on; everything
/// else indicates a driver- or filesystem-level problem.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store busy (exceeded busy-timeout): {0}")]
    Busy(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Reclassify a raw sqlite error as [`StoreError::Busy`] when it's a
    /// `SQLITE_BUSY`/`SQLITE_LOCKED` code, so callers can match on it
    /// without reaching into `rusqlite::ErrorCode`.
    pub(crate) fn from_rusqlite(err: rusqlite::Error) -> Self {
        use rusqlite::ffi::ErrorCode;
        if let rusqlite::Error::SqliteFailure(e, ref msg) = err {
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) {
                return StoreError::Busy(msg.clone().unwrap_or_else(|| e.to_string()));
            }
        }
        StoreError::Sqlite(err)
    }
}
