//! Plan command handlers

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;

use crate::config::Config;

/// Plan subcommands
#[derive(Subcommand)]
pub enum PlanCommands {
    /// List the plans of an API
    List {
        /// API id
        #[arg(long)]
        api: String,
    },
}

/// Handle plan commands
pub async fn handle_plan_command(command: PlanCommands, config: &Config) -> Result<()> {
    let client = config.client()?;

    match command {
        PlanCommands::List { api } => {
            let plans = client
                .list_plans(&api)
                .await
                .with_context(|| format!("Failed to fetch plans for API {}", api))?;

            if plans.is_empty() {
                println!("{}", "No plans found.".yellow());
                return Ok(());
            }

            println!("{}", format!("Found {} plan(s):", plans.len()).bold());
            println!();
            for plan in plans {
                println!("  {} {} {}", "▸".cyan(), plan.name.bold(), plan.id.dimmed());
            }
            Ok(())
        }
    }
}
