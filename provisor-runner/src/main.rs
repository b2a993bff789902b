//! Provisor Runner
//!
//! Provisions a batch of test applications against an API-management platform
//! and verifies each one's API key at the gateway.
//!
//! Architecture:
//! - Configuration: load settings from the environment, fail fast if incomplete
//! - Services: the per-unit provisioning pipeline and the API it talks to
//! - Scheduler: bounded worker pool running the pipeline over a range of units
//!
//! Unit failures are logged and reported; they never change the exit status.

mod config;
mod report;
mod scheduler;
mod service;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use provisor_client::{GatewayClient, ManagementClient};
use tracing::{error, info, info_span, warn, Instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::config::Config;
use crate::report::BatchSummary;
use crate::scheduler::BatchDriver;
use crate::service::pipeline::PipelineSettings;
use crate::service::{HttpProvisioningApi, Pipeline};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "provisor_runner=info,provisor_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration problems are fatal before any network call
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let run_id = Uuid::new_v4();
    match run(config, run_id).instrument(info_span!("batch", %run_id)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Batch aborted: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Loads and validates configuration from the environment
fn load_config() -> Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}

async fn run(config: Config, run_id: Uuid) -> Result<()> {
    info!("Starting Provisor Runner");
    info!(
        "Loaded configuration: management_url={}, api={:?}, api_version={}, gateway={}",
        config.management_url, config.api, config.api_version, config.gateway_endpoint
    );

    // Initialize clients
    let management = ManagementClient::new(config.management_url.clone(), &config.admin_token)
        .context("Failed to build management client")?
        .with_version(config.api_version)
        .with_scope(config.organization.clone(), config.environment.clone())
        .with_retry_policy(config.retry.clone());
    let gateway = GatewayClient::new(config.gateway_endpoint.clone())
        .with_key_header(config.api_key_header.clone())
        .with_policy(config.probe.clone());

    let api = Arc::new(HttpProvisioningApi::new(management, gateway));

    // A name that matches no API is fatal before any unit runs
    let api_id = config
        .api
        .resolve(&*api)
        .await
        .context("Failed to resolve the target API")?;
    info!("Targeting API {}", api_id);

    let pipeline = Pipeline::new(
        api,
        PipelineSettings {
            api_id,
            app_prefix: config.app_prefix.clone(),
            plan: config.plan.clone(),
            keys: config.keys.clone(),
        },
    );

    info!(
        "Plan strategy: {:?}, key policy: {:?}",
        pipeline.settings().plan,
        pipeline.settings().keys
    );

    let driver = BatchDriver::new(pipeline);
    let started_at = Utc::now();
    let report = driver
        .run_batch(config.start_index, config.unit_count, config.concurrency)
        .await?;

    for failure in report.failures() {
        warn!(
            "{} (index {}) left at {}: application={:?} subscription={:?}",
            failure.unit.name,
            failure.unit.index,
            failure.state,
            failure.unit.application_id,
            failure.unit.subscription_id
        );
    }

    if let Some(path) = &config.report_path {
        BatchSummary::new(run_id, started_at, &report).write_to(path)?;
        info!("Wrote batch report to {}", path);
    }

    let progress = driver.progress();
    info!(
        "Done: {}/{} unit(s) completed, {} failed",
        progress.completed(),
        progress.total(),
        progress.failed()
    );

    Ok(())
}
