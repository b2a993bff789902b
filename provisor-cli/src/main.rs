//! Provisor CLI
//!
//! Command-line interface for inspecting and cleaning up what the provisioning
//! runner leaves on the management API.

mod commands;
mod config;

use anyhow::{Result, bail};
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use provisor_core::ApiVersion;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "provisor")]
#[command(about = "Provisor API-management test data CLI", long_about = None)]
struct Cli {
    /// Management API root URL
    #[arg(long, env = "MANAGEMENT_URL")]
    management_url: String,

    /// Administrative bearer token
    #[arg(long, env = "ADMIN_TOKEN", hide_env_values = true)]
    token: String,

    /// Management API version (v1 or v2)
    #[arg(long, env = "API_VERSION", default_value = "v2")]
    api_version: ApiVersion,

    /// Organization scope
    #[arg(long, env = "ORGANIZATION", default_value = "DEFAULT")]
    organization: String,

    /// Environment scope
    #[arg(long, env = "ENVIRONMENT", default_value = "DEFAULT")]
    environment: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "provisor_client=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if cli.management_url.trim().is_empty() || cli.token.trim().is_empty() {
        bail!("MANAGEMENT_URL and ADMIN_TOKEN must be set");
    }

    let config = Config {
        management_url: cli.management_url,
        admin_token: cli.token,
        api_version: cli.api_version,
        organization: cli.organization,
        environment: cli.environment,
    };

    handle_command(cli.command, &config).await
}
