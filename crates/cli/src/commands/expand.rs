// SPDX-License-Identifier: MIT

//! `jm expand`: compile a plan file into jobs, direct against the store.
//!
//! Unlike the other client subcommands this talks to the database file
//! directly rather than going through a running server — the durable
//! store's WAL mode tolerates a concurrent writer just fine, and a plan
//! can be expanded whether or not a server is currently serving `/ready`.

use jm_core::{Clock, SystemClock};
use jm_store::{PlanDep, PlanJob, Store};
use std::collections::HashMap;
use std::path::Path;

pub fn run(db: &str, plan: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(db).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let compiled = jm_compiler::compile_plan_file(Path::new(plan))?;
    let store = Store::open(db)?;

    let jobs: Vec<PlanJob> = compiled
        .steps
        .iter()
        .map(|s| PlanJob { id: &s.global_id, lane: s.lane, payload: &s.payload, dedupe_key: s.dedupe_key.as_deref(), max_attempts: 3 })
        .collect();

    let id_map: HashMap<&str, _> = compiled.steps.iter().map(|s| (s.local_id.as_str(), &s.global_id)).collect();
    let deps: Vec<PlanDep> = compiled
        .steps
        .iter()
        .flat_map(|s| s.deps.iter().map(move |d| (s, d)))
        .map(|(s, d)| PlanDep { job_id: &s.global_id, dep_id: id_map[d.as_str()] })
        .collect();

    store.apply_plan(&jobs, &deps, SystemClock.now_ms())?;
    println!("[jm] expanded plan '{}' -> {} jobs", compiled.plan_id, compiled.steps.len());
    Ok(())
}
