//! Application command handlers
//!
//! Lists generated applications and deletes them by id, either given on the
//! command line or taken from a runner batch report.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use provisor_client::ManagementClient;
use provisor_core::domain::ApplicationRecord;
use serde::Deserialize;

use crate::config::Config;

/// Application subcommands
#[derive(Subcommand)]
pub enum AppCommands {
    /// List applications
    List {
        /// Only show applications whose name starts with this prefix
        #[arg(short, long)]
        prefix: Option<String>,
    },
    /// Delete applications by id
    Delete {
        /// Application ids
        ids: Vec<String>,

        /// Also delete the applications of failed units in a runner report.
        /// Plans recorded in the report are kept, since a shared plan serves
        /// every unit; remove per-unit plans with `cleanup --plan-prefix`.
        #[arg(long)]
        from_report: Option<String>,
    },
}

/// Handle application commands
pub async fn handle_app_command(command: AppCommands, config: &Config) -> Result<()> {
    let client = config.client()?;

    match command {
        AppCommands::List { prefix } => list_applications(&client, prefix.as_deref()).await,
        AppCommands::Delete { ids, from_report } => {
            let mut targets: BTreeSet<String> = ids.into_iter().collect();
            if let Some(path) = from_report {
                targets.extend(read_report_application_ids(Path::new(&path))?);
            }
            delete_applications(&client, targets).await
        }
    }
}

/// Keep applications whose name starts with `prefix`, if any
pub fn filter_by_prefix(apps: Vec<ApplicationRecord>, prefix: Option<&str>) -> Vec<ApplicationRecord> {
    match prefix {
        Some(prefix) => apps
            .into_iter()
            .filter(|app| app.name.starts_with(prefix))
            .collect(),
        None => apps,
    }
}

async fn list_applications(client: &ManagementClient, prefix: Option<&str>) -> Result<()> {
    let apps = client
        .list_applications()
        .await
        .context("Failed to fetch applications")?;
    let apps = filter_by_prefix(apps, prefix);

    if apps.is_empty() {
        println!("{}", "No applications found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} application(s):", apps.len()).bold());
    println!();
    for app in apps {
        println!("  {} {} {}", "▸".cyan(), app.name.bold(), app.id.dimmed());
    }

    Ok(())
}

async fn delete_applications(client: &ManagementClient, ids: BTreeSet<String>) -> Result<()> {
    if ids.is_empty() {
        println!("{}", "Nothing to delete.".yellow());
        return Ok(());
    }

    let mut failed = 0;
    for id in &ids {
        match client.delete_application(id).await {
            Ok(()) => println!("{} Deleted application {}", "✓".green(), id),
            Err(e) => {
                failed += 1;
                println!("{} Failed to delete application {}: {}", "✗".red(), id, e);
            }
        }
    }

    println!();
    println!(
        "{}",
        format!("Deleted {}/{} application(s)", ids.len() - failed, ids.len()).bold()
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ReportFile {
    #[serde(default)]
    failures: Vec<ReportFailure>,
}

#[derive(Debug, Deserialize)]
struct ReportFailure {
    application_id: Option<String>,
}

/// Application ids of failed units in a runner batch report
fn read_report_application_ids(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report {}", path.display()))?;
    parse_report_application_ids(&raw)
        .with_context(|| format!("Failed to parse report {}", path.display()))
}

fn parse_report_application_ids(raw: &str) -> Result<Vec<String>> {
    let report: ReportFile = serde_json::from_str(raw)?;
    Ok(report
        .failures
        .into_iter()
        .filter_map(|failure| failure.application_id)
        .collect())
}
