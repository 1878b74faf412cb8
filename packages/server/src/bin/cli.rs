//! Operator CLI for the interpreter scheduler: a thin wrapper for forcing a
//! scheduler pass or inspecting the policy in force, run out-of-band from the
//! long-lived server process.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;

use scheduler_core::kernel::logging::BufferedDecisionLogSink;
use scheduler_core::kernel::{Config, Policy, PolicyStore};
use scheduler_core::scheduler::SchedulerService;
use scheduler_core::store::postgres::PgStore;

#[derive(Parser)]
#[command(name = "scheduler-cli")]
#[command(about = "Operator tooling for the interpreter scheduler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Force one claim-and-assign pass against the database right now.
    RunPass,

    /// Print the default policy that a fresh process would start with.
    ShowPolicy,
}

#[derive(Serialize)]
struct RunPassResponse {
    decided: usize,
}

fn output<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::RunPass => cmd_run_pass().await,
        Commands::ShowPolicy => cmd_show_policy(),
    }
}

fn cmd_show_policy() -> Result<()> {
    output(&Policy::default())
}

async fn cmd_run_pass() -> Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    let store = Arc::new(PgStore::new(pool));
    let policy_store = PolicyStore::default();
    let (sink, _receiver) = BufferedDecisionLogSink::new(64);
    let scheduler = SchedulerService::new(store, policy_store, Arc::new(sink), config);

    let decided = scheduler
        .run_pass()
        .await
        .context("scheduler pass failed")?;

    output(&RunPassResponse { decided })
}
