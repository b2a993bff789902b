//! Plan endpoints

use crate::ManagementClient;
use crate::error::{ClientError, Result};
use provisor_core::domain::PlanRef;
use provisor_core::dto::Listing;
use provisor_core::dto::plan::CreatePlan;
use tracing::{debug, info};

impl ManagementClient {
    // =============================================================================
    // Plan Query
    // =============================================================================

    /// List all plans of an API
    pub async fn list_plans(&self, api_id: &str) -> Result<Vec<PlanRef>> {
        let path = format!("{}/apis/{}/plans", self.versioned_path(), api_id);
        let response = self.transport.get(&path).await?;

        let listing: Listing<PlanRef> = self.parse_json(response).await?;
        Ok(listing.into_items())
    }

    /// Resolve a plan of an API by exact name
    ///
    /// # Errors
    /// Returns `NotFound` when no plan carries exactly `plan_name`.
    pub async fn resolve_plan(&self, api_id: &str, plan_name: &str) -> Result<PlanRef> {
        let plans = self.list_plans(api_id).await?;
        debug!("Scanning {} plan(s) of API {} for '{}'", plans.len(), api_id, plan_name);

        PlanRef::find_exact(&plans, plan_name)
            .cloned()
            .ok_or_else(|| {
                ClientError::NotFound(format!("plan '{}' for API {}", plan_name, api_id))
            })
    }

    // =============================================================================
    // Plan Lifecycle
    // =============================================================================

    /// Create an API key plan and publish it
    ///
    /// A plan only accepts subscriptions once published.
    pub async fn create_plan(&self, api_id: &str, plan_name: &str) -> Result<PlanRef> {
        let path = format!("{}/apis/{}/plans", self.versioned_path(), api_id);
        let body = CreatePlan::api_key(self.version, plan_name);
        let response = self.transport.post(&path, &body).await?;

        let mut plan: PlanRef = self.parse_json(response).await?;
        if plan.name.is_empty() {
            plan.name = plan_name.to_string();
        }

        let publish = format!("{}/{}/_publish", path, plan.id);
        self.transport.send::<()>(reqwest::Method::POST, &publish, None).await?;

        info!("Created and published plan {} ({})", plan.name, plan.id);
        Ok(plan)
    }

    /// Delete a plan
    pub async fn delete_plan(&self, api_id: &str, plan_id: &str) -> Result<()> {
        let path = format!("{}/apis/{}/plans/{}", self.versioned_path(), api_id, plan_id);
        self.transport.delete(&path).await?;
        Ok(())
    }
}
