//! Subscription command handlers

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;

use crate::config::Config;

/// Subscription subcommands
#[derive(Subcommand)]
pub enum SubscriptionCommands {
    /// List all subscriptions
    List {
        /// Only show subscriptions to this plan
        #[arg(long)]
        plan: Option<String>,
    },
}

/// Handle subscription commands
pub async fn handle_subscription_command(command: SubscriptionCommands, config: &Config) -> Result<()> {
    let client = config.client()?;

    match command {
        SubscriptionCommands::List { plan } => {
            let subscriptions = client
                .list_subscriptions()
                .await
                .context("Failed to fetch subscriptions")?;
            let subscriptions: Vec<_> = subscriptions
                .into_iter()
                .filter(|s| plan.is_none() || s.plan == plan)
                .collect();

            if subscriptions.is_empty() {
                println!("{}", "No subscriptions found.".yellow());
                return Ok(());
            }

            println!("{}", format!("Found {} subscription(s):", subscriptions.len()).bold());
            println!();
            for sub in subscriptions {
                println!("  {} Subscription {}", "▸".cyan(), sub.id.bold());
                println!(
                    "    Application:  {}",
                    sub.application.as_deref().unwrap_or("-").dimmed()
                );
                println!("    Plan:         {}", sub.plan.as_deref().unwrap_or("-").dimmed());
            }
            Ok(())
        }
    }
}
