//! Cleanup command handler
//!
//! Removes what load runs leave behind: generated applications, the plans
//! created for them, and subscriptions to those plans. Names carry the unit
//! index as a suffix (`AutomatedApp-7`, `Plan-App-7`), which is how the index
//! range is matched.

use std::collections::HashSet;

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use provisor_client::ManagementClient;
use provisor_core::domain::{ApplicationRecord, DEFAULT_APP_PREFIX, PlanRef};
use provisor_core::dto::subscription::SubscriptionSummary;
use tracing::debug;

use crate::config::Config;

pub const DEFAULT_PLAN_PREFIX: &str = "Plan-App-";

#[derive(Args)]
pub struct CleanupArgs {
    /// API whose generated plans should be deleted
    #[arg(long)]
    pub api: String,

    /// Prefix of generated application names
    #[arg(long, default_value = DEFAULT_APP_PREFIX)]
    pub app_prefix: String,

    /// Prefix of generated plan names
    #[arg(long, default_value = DEFAULT_PLAN_PREFIX)]
    pub plan_prefix: String,

    /// First unit index to delete (inclusive)
    #[arg(long)]
    pub from: Option<u64>,

    /// Last unit index to delete (inclusive)
    #[arg(long)]
    pub to: Option<u64>,

    /// Print what would be deleted without deleting it
    #[arg(long)]
    pub dry_run: bool,
}

/// Inclusive index range; open ends match anything
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexRange {
    pub from: Option<u64>,
    pub to: Option<u64>,
}

impl IndexRange {
    /// Whether `name` is `prefix` followed by an index inside the range
    pub fn matches(&self, name: &str, prefix: &str) -> bool {
        let Some(suffix) = name.strip_prefix(prefix) else {
            return false;
        };
        let Ok(index) = suffix.parse::<u64>() else {
            return false;
        };
        self.from.is_none_or(|from| index >= from) && self.to.is_none_or(|to| index <= to)
    }
}

/// Everything a cleanup run will delete
#[derive(Debug, Default)]
pub struct CleanupTargets {
    pub applications: Vec<ApplicationRecord>,
    pub plans: Vec<PlanRef>,
    pub subscriptions: Vec<SubscriptionSummary>,
}

impl CleanupTargets {
    /// Select matching applications and plans, then the subscriptions to
    /// those plans
    pub fn select(
        range: IndexRange,
        app_prefix: &str,
        plan_prefix: &str,
        applications: Vec<ApplicationRecord>,
        plans: Vec<PlanRef>,
        subscriptions: Vec<SubscriptionSummary>,
    ) -> Self {
        let applications: Vec<_> = applications
            .into_iter()
            .filter(|app| range.matches(&app.name, app_prefix))
            .collect();
        let plans: Vec<_> = plans
            .into_iter()
            .filter(|plan| range.matches(&plan.name, plan_prefix))
            .collect();

        let plan_ids: HashSet<&str> = plans.iter().map(|p| p.id.as_str()).collect();
        let subscriptions = subscriptions
            .into_iter()
            .filter(|sub| sub.plan.as_deref().is_some_and(|id| plan_ids.contains(id)))
            .collect();

        Self {
            applications,
            plans,
            subscriptions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty() && self.plans.is_empty() && self.subscriptions.is_empty()
    }
}

/// Handle the cleanup command
pub async fn handle_cleanup(args: CleanupArgs, config: &Config) -> Result<()> {
    let client = config.client()?;
    let range = IndexRange {
        from: args.from,
        to: args.to,
    };

    // Snapshot subscriptions before anything is deleted
    let applications = client
        .list_applications()
        .await
        .context("Failed to fetch applications")?;
    let plans = client
        .list_plans(&args.api)
        .await
        .with_context(|| format!("Failed to fetch plans for API {}", args.api))?;
    let subscriptions = client
        .list_subscriptions()
        .await
        .context("Failed to fetch subscriptions")?;

    let targets = CleanupTargets::select(
        range,
        &args.app_prefix,
        &args.plan_prefix,
        applications,
        plans,
        subscriptions,
    );
    debug!(?range, api = %args.api, "Selected cleanup targets");

    if targets.is_empty() {
        println!("{}", "Nothing to clean up.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "Found {} application(s), {} plan(s), {} subscription(s)",
            targets.applications.len(),
            targets.plans.len(),
            targets.subscriptions.len()
        )
        .bold()
    );

    if args.dry_run {
        print_targets(&targets);
        println!();
        println!("{}", "Dry run, nothing deleted.".yellow());
        return Ok(());
    }

    let failed = delete_targets(&client, &args.api, &targets).await;

    println!();
    if failed == 0 {
        println!("{}", "✓ Cleanup complete".green().bold());
    } else {
        println!("{}", format!("Cleanup finished with {} failure(s)", failed).red().bold());
    }
    Ok(())
}

fn print_targets(targets: &CleanupTargets) {
    for app in &targets.applications {
        println!("  {} application {} {}", "▸".cyan(), app.name.bold(), app.id.dimmed());
    }
    for plan in &targets.plans {
        println!("  {} plan {} {}", "▸".cyan(), plan.name.bold(), plan.id.dimmed());
    }
    for sub in &targets.subscriptions {
        println!("  {} subscription {}", "▸".cyan(), sub.id.dimmed());
    }
}

/// Delete every target, reporting each failure; returns the failure count
async fn delete_targets(client: &ManagementClient, api_id: &str, targets: &CleanupTargets) -> usize {
    let mut failed = 0;

    for app in &targets.applications {
        match client.delete_application(&app.id).await {
            Ok(()) => println!("{} Deleted application {}", "✓".green(), app.name),
            Err(e) => {
                failed += 1;
                println!("{} Failed to delete application {}: {}", "✗".red(), app.name, e);
            }
        }
    }

    for plan in &targets.plans {
        match client.delete_plan(api_id, &plan.id).await {
            Ok(()) => println!("{} Deleted plan {}", "✓".green(), plan.name),
            Err(e) => {
                failed += 1;
                println!("{} Failed to delete plan {}: {}", "✗".red(), plan.name, e);
            }
        }
    }

    for sub in &targets.subscriptions {
        let Some(application_id) = sub.application.as_deref() else {
            println!("{} Subscription {} has no application, skipped", "-".dimmed(), sub.id);
            continue;
        };
        match client.delete_subscription(application_id, &sub.id).await {
            Ok(()) => println!("{} Deleted subscription {}", "✓".green(), sub.id),
            // Gone along with its application or plan
            Err(e) if e.is_not_found() => {
                println!("{} Subscription {} already removed", "-".dimmed(), sub.id)
            }
            Err(e) => {
                failed += 1;
                println!("{} Failed to delete subscription {}: {}", "✗".red(), sub.id, e);
            }
        }
    }

    failed
}
