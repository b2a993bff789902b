//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod apps;
mod cleanup;
mod groups;
mod plans;
mod subscriptions;

pub use apps::AppCommands;
pub use cleanup::CleanupArgs;
pub use groups::GroupCommands;
pub use plans::PlanCommands;
pub use subscriptions::SubscriptionCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Application management
    Apps {
        #[command(subcommand)]
        command: AppCommands,
    },
    /// Plan management
    Plans {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Subscription management
    Subscriptions {
        #[command(subcommand)]
        command: SubscriptionCommands,
    },
    /// Group assignment
    Groups {
        #[command(subcommand)]
        command: GroupCommands,
    },
    /// Delete generated applications, plans and their subscriptions
    Cleanup(CleanupArgs),
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Apps { command } => apps::handle_app_command(command, config).await,
        Commands::Plans { command } => plans::handle_plan_command(command, config).await,
        Commands::Subscriptions { command } => {
            subscriptions::handle_subscription_command(command, config).await
        }
        Commands::Groups { command } => groups::handle_group_command(command, config).await,
        Commands::Cleanup(args) => cleanup::handle_cleanup(args, config).await,
    }
}
