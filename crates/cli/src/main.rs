// SPDX-License-Identifier: MIT

//! Command-line entry point: starts the server or a worker, or acts as a
//! thin HTTP client against an already-running server.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;

use clap::{Parser, Subcommand};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 7337;
pub const DEFAULT_DB: &str = ".cursor/code/code.db";

#[derive(Parser)]
#[command(name = "jm", version, about = "Local DAG scheduler + worker for multi-agent collaboration")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP scheduler server
    Server {
        #[arg(long, default_value = ".cursor/code/code.db")]
        db: String,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 7337u16)]
        port: u16,
    },
    /// Start a worker loop against a running server
    Worker {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 7337u16)]
        port: u16,
        #[arg(long)]
        holder: Option<String>,
        #[arg(long)]
        lane: Option<i64>,
        #[arg(long, default_value_t = 1)]
        batch: u32,
        #[arg(long, default_value_t = 2.0)]
        poll: f64,
        #[arg(long, default_value = "local")]
        mode: String,
    },
    /// Enqueue a job
    Enqueue {
        payload: String,
        #[arg(long)]
        id: Option<String>,
        #[arg(long, default_value_t = 0)]
        lane: i64,
        #[arg(long, default_value = "")]
        deps: String,
        #[arg(long)]
        dedupe: Option<String>,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 7337u16)]
        port: u16,
    },
    /// Mark a job done
    Done {
        id: String,
        #[arg(long)]
        holder: Option<String>,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 7337u16)]
        port: u16,
    },
    /// Mark a job failed
    Fail {
        id: String,
        #[arg(long)]
        holder: Option<String>,
        #[arg(long, default_value = "")]
        error: String,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 7337u16)]
        port: u16,
    },
    /// Heartbeat a running job
    Heartbeat {
        id: String,
        #[arg(long)]
        holder: String,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 7337u16)]
        port: u16,
    },
    /// Compile a plan into jobs
    Expand {
        plan: String,
        #[arg(long, default_value = ".cursor/code/code.db")]
        db: String,
    },
    /// Show job stats
    Stats {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 7337u16)]
        port: u16,
    },
    /// List jobs
    Jobs {
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 100)]
        limit: u32,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 7337u16)]
        port: u16,
    },
    /// Print the worker contract block
    Join {
        #[arg(long, default_value = "pane-N")]
        holder: String,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 7337u16)]
        port: u16,
    },
    /// Print the executor contract block
    Exec {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 7337u16)]
        port: u16,
    },
    /// Compute the SHA-1 of a file
    Hash { path: String },
    /// Ensure the server is running, expand a plan, print join instructions
    Run {
        plan: String,
        #[arg(long, default_value_t = 0)]
        agents: u32,
        #[arg(long)]
        spawn_local: bool,
        #[arg(long, default_value = ".cursor/code/code.db")]
        db: String,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 7337u16)]
        port: u16,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Server { db, host, port } => commands::server::run(&db, &host, port),
        Command::Worker { host, port, holder, lane, batch, poll, mode } => {
            commands::worker::run(&host, port, holder, lane, batch, poll, &mode)
        }
        Command::Enqueue { payload, id, lane, deps, dedupe, host, port } => {
            commands::queue::enqueue(&host, port, &payload, id, lane, &deps, dedupe)
        }
        Command::Done { id, holder, host, port } => commands::queue::done(&host, port, &id, holder),
        Command::Fail { id, holder, error, host, port } => commands::queue::fail(&host, port, &id, holder, &error),
        Command::Heartbeat { id, holder, host, port } => commands::queue::heartbeat(&host, port, &id, &holder),
        Command::Expand { plan, db } => commands::expand::run(&db, &plan),
        Command::Stats { host, port } => commands::queue::stats(&host, port),
        Command::Jobs { status, limit, host, port } => commands::queue::jobs(&host, port, status, limit),
        Command::Join { holder, host, port } => {
            println!("{}", commands::contracts::worker_contract(&host, port, &holder));
            Ok(())
        }
        Command::Exec { host, port } => {
            println!("{}", commands::contracts::executor_contract(&host, port));
            Ok(())
        }
        Command::Hash { path } => commands::hash::run(&path),
        Command::Run { plan, agents, spawn_local, db, host, port } => {
            commands::run::run(&plan, agents, spawn_local, &db, &host, port)
        }
    }
}
