//! Group assignment command handler

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use colored::*;
use provisor_client::ManagementClient;
use provisor_core::domain::DEFAULT_APP_PREFIX;

use crate::config::Config;

/// How an application is put into a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AssignMode {
    /// Rewrite the application definition with the group added
    Update,
    /// Use the group membership endpoint
    Membership,
}

/// Group subcommands
#[derive(Subcommand)]
pub enum GroupCommands {
    /// Add every application whose name starts with a prefix to a group
    Assign {
        /// Group id
        #[arg(long)]
        group: String,

        /// Application name prefix
        #[arg(long, default_value = DEFAULT_APP_PREFIX)]
        prefix: String,

        /// Assignment method
        #[arg(long, value_enum, default_value_t = AssignMode::Update)]
        mode: AssignMode,
    },
}

/// Handle group commands
pub async fn handle_group_command(command: GroupCommands, config: &Config) -> Result<()> {
    let client = config.client()?;

    match command {
        GroupCommands::Assign {
            group,
            prefix,
            mode,
        } => assign_group(&client, &group, &prefix, mode).await,
    }
}

async fn assign_group(client: &ManagementClient, group: &str, prefix: &str, mode: AssignMode) -> Result<()> {
    let apps: Vec<_> = client
        .list_applications()
        .await
        .context("Failed to fetch applications")?
        .into_iter()
        .filter(|app| app.name.starts_with(prefix))
        .collect();

    if apps.is_empty() {
        println!("{}", format!("No applications start with '{}'.", prefix).yellow());
        return Ok(());
    }

    let mut assigned = 0;
    let mut unchanged = 0;
    let mut failed = 0;

    for app in &apps {
        let result = match mode {
            AssignMode::Update => client.assign_group_by_update(&app.id, group).await,
            AssignMode::Membership => client.add_group_member(group, &app.id).await.map(|()| true),
        };

        match result {
            Ok(true) => {
                assigned += 1;
                println!("{} {} added to group {}", "✓".green(), app.name, group);
            }
            Ok(false) => {
                unchanged += 1;
                println!("{} {} already in group {}", "-".dimmed(), app.name, group);
            }
            Err(e) => {
                failed += 1;
                println!("{} Failed to assign {}: {}", "✗".red(), app.name, e);
            }
        }
    }

    println!();
    println!(
        "{}",
        format!(
            "{} assigned, {} unchanged, {} failed of {} application(s)",
            assigned,
            unchanged,
            failed,
            apps.len()
        )
        .bold()
    );
    Ok(())
}
