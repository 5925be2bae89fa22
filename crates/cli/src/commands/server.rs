// SPDX-License-Identifier: MIT

//! `jm server`: start the HTTP scheduler server.

use jm_core::SystemClock;
use jm_scheduler::{ArtifactIndex, Scheduler};
use jm_store::Store;
use std::sync::Arc;
use tracing::info;

pub fn run(db: &str, host: &str, port: u16) -> anyhow::Result<()> {
    if let Some(parent) = std::path::Path::new(db).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let store = Store::open(db)?;
    let scheduler = Scheduler::new(store, ArtifactIndex::default_location(), Arc::new(SystemClock));
    let app = jm_httpd::router(scheduler);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let addr = format!("{host}:{port}");
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(%addr, "scheduler server listening");
        axum::serve(listener, app).await?;
        anyhow::Ok(())
    })
}
