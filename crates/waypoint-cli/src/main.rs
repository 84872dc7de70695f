//! Waypoint CLI
//!
//! Command-line interface for plan tracking and autonomous goal execution.

mod args;
mod cli;
mod collaborators;
mod renderer;
mod tools;

use anyhow::{Context, Result};
use args::{Args, Commands};
use clap::Parser;
use cli::Cli;
use log::info;
use renderer::TerminalRenderer;
use waypoint_core::{params::ListPlans, PlanStoreBuilder};
use Commands::*;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let Args {
        database_file,
        no_color,
        user,
        command,
    } = Args::parse();

    let store = PlanStoreBuilder::new()
        .with_database_path(database_file)
        .build()
        .await
        .context("Failed to initialize plan store")?;

    info!("Waypoint started with {}", store.database_path().display());

    let cli = Cli::new(store, TerminalRenderer::new(!no_color), user.clone());

    match command {
        Some(Plan { command }) => cli.handle_plan_command(command).await,
        Some(Phase { command }) => cli.handle_phase_command(command).await,
        Some(Task { command }) => cli.handle_task_command(command).await,
        Some(Run(args)) => cli.run(args).await,
        None => {
            cli.list_plans(&ListPlans {
                user_id: user,
                status: None,
            })
            .await
        }
    }
}
