//! Subscription and API key endpoints

use crate::ManagementClient;
use crate::error::Result;
use provisor_core::domain::{ApiKey, SubscriptionRecord};
use provisor_core::dto::Listing;
use provisor_core::dto::subscription::{
    ApiKeyEntry, CreateSubscription, Created, SubscriptionSummary,
};
use tracing::{debug, info};

impl ManagementClient {
    // =============================================================================
    // Subscription Lifecycle
    // =============================================================================

    /// Subscribe an application to a plan
    ///
    /// The subscription may not be fully active on the platform yet when this
    /// returns; its API key can appear later.
    pub async fn create_subscription(
        &self,
        api_id: &str,
        application_id: &str,
        plan_id: &str,
    ) -> Result<SubscriptionRecord> {
        let path = format!("{}/apis/{}/subscriptions", self.versioned_path(), api_id);
        let body = CreateSubscription::new(self.version, application_id, plan_id);
        let response = self.transport.post(&path, &body).await?;

        let created: Created = self.parse_json(response).await?;
        info!(
            "Created subscription {} (application {}, plan {})",
            created.id, application_id, plan_id
        );

        Ok(SubscriptionRecord {
            id: created.id,
            application_id: application_id.to_string(),
            plan_id: plan_id.to_string(),
        })
    }

    /// List all subscriptions
    pub async fn list_subscriptions(&self) -> Result<Vec<SubscriptionSummary>> {
        let path = format!("{}/subscriptions", self.v1_path());
        let response = self.transport.get(&path).await?;

        let listing: Listing<SubscriptionSummary> = self.parse_json(response).await?;
        Ok(listing.into_items())
    }

    /// Delete an application's subscription
    pub async fn delete_subscription(&self, application_id: &str, subscription_id: &str) -> Result<()> {
        let path = format!(
            "{}/applications/{}/subscriptions/{}",
            self.v1_path(),
            application_id,
            subscription_id
        );
        self.transport.delete(&path).await?;
        Ok(())
    }

    // =============================================================================
    // API Keys
    // =============================================================================

    /// Fetch the usable API keys of a subscription
    ///
    /// An empty vector means no key has been issued yet; it is not an error.
    /// Revoked keys are left out.
    pub async fn fetch_api_keys(&self, api_id: &str, subscription_id: &str) -> Result<Vec<ApiKey>> {
        let path = format!(
            "{}/apis/{}/subscriptions/{}/apikeys",
            self.v1_path(),
            api_id,
            subscription_id
        );
        let response = self.transport.get(&path).await?;

        let listing: Listing<ApiKeyEntry> = self.parse_json(response).await?;
        let keys: Vec<ApiKey> = listing
            .into_items()
            .into_iter()
            .filter(|entry| !entry.revoked)
            .map(|entry| ApiKey::new(entry.key))
            .collect();

        debug!("Subscription {} has {} key(s)", subscription_id, keys.len());
        Ok(keys)
    }
}
