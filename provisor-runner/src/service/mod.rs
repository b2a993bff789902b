//! Service layer
//!
//! Services contain the business logic of the runner. The provisioning
//! pipeline talks to the platform only through [`ProvisioningApi`], so it can
//! run against the HTTP clients in production and against an in-memory fake
//! in tests.

pub mod pipeline;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use provisor_client::{GatewayClient, ManagementClient, ProbeResponse, Result};
use provisor_core::domain::{ApiKey, ApiRef, ApplicationRecord, ApplicationSpec, PlanRef, SubscriptionRecord};

pub use pipeline::{Pipeline, PipelineFailure, RunOutcome, StepError};

/// Which API a batch targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiTarget {
    /// Known identifier, used as is
    Id(String),
    /// Looked up by exact name once before the batch starts
    Name(String),
}

impl ApiTarget {
    /// Identifier of the targeted API
    ///
    /// # Errors
    /// `NotFound` when no API carries the configured name.
    pub async fn resolve(&self, api: &dyn ProvisioningApi) -> Result<String> {
        match self {
            ApiTarget::Id(id) => Ok(id.clone()),
            ApiTarget::Name(name) => api.resolve_api(name).await.map(|found| found.id),
        }
    }
}

/// Remote operations one pipeline run needs
#[async_trait]
pub trait ProvisioningApi: Send + Sync {
    /// Find an API by exact name
    async fn resolve_api(&self, api_name: &str) -> Result<ApiRef>;

    /// Create an application; never deduplicated
    async fn create_application(&self, spec: &ApplicationSpec) -> Result<ApplicationRecord>;

    /// Find a plan of `api_id` by exact name
    async fn resolve_plan(&self, api_id: &str, plan_name: &str) -> Result<PlanRef>;

    /// Create and publish a plan on `api_id`
    async fn create_plan(&self, api_id: &str, plan_name: &str) -> Result<PlanRef>;

    /// Subscribe an application to a plan
    async fn create_subscription(
        &self,
        api_id: &str,
        application_id: &str,
        plan_id: &str,
    ) -> Result<SubscriptionRecord>;

    /// Keys issued so far for a subscription, possibly none
    async fn fetch_api_keys(&self, api_id: &str, subscription_id: &str) -> Result<Vec<ApiKey>>;

    /// Call the gateway with a key
    async fn probe(&self, api_key: &ApiKey) -> Result<ProbeResponse>;
}

/// HTTP implementation of ProvisioningApi
pub struct HttpProvisioningApi {
    management: ManagementClient,
    gateway: GatewayClient,
}

impl HttpProvisioningApi {
    pub fn new(management: ManagementClient, gateway: GatewayClient) -> Self {
        Self {
            management,
            gateway,
        }
    }
}

#[async_trait]
impl ProvisioningApi for HttpProvisioningApi {
    async fn resolve_api(&self, api_name: &str) -> Result<ApiRef> {
        self.management.resolve_api(api_name).await
    }

    async fn create_application(&self, spec: &ApplicationSpec) -> Result<ApplicationRecord> {
        self.management.create_application(spec).await
    }

    async fn resolve_plan(&self, api_id: &str, plan_name: &str) -> Result<PlanRef> {
        self.management.resolve_plan(api_id, plan_name).await
    }

    async fn create_plan(&self, api_id: &str, plan_name: &str) -> Result<PlanRef> {
        self.management.create_plan(api_id, plan_name).await
    }

    async fn create_subscription(
        &self,
        api_id: &str,
        application_id: &str,
        plan_id: &str,
    ) -> Result<SubscriptionRecord> {
        self.management
            .create_subscription(api_id, application_id, plan_id)
            .await
    }

    async fn fetch_api_keys(&self, api_id: &str, subscription_id: &str) -> Result<Vec<ApiKey>> {
        self.management.fetch_api_keys(api_id, subscription_id).await
    }

    async fn probe(&self, api_key: &ApiKey) -> Result<ProbeResponse> {
        self.gateway.probe(api_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::FakeApi;
    use provisor_client::ClientError;

    #[tokio::test]
    async fn test_target_by_id_makes_no_call() {
        let api = FakeApi::new();
        let id = ApiTarget::Id("api-7".to_string()).resolve(&api).await.unwrap();
        assert_eq!(id, "api-7");
        assert_eq!(api.api_lookups(), 0);
    }

    #[tokio::test]
    async fn test_target_by_name() {
        let api = FakeApi::new().with_api("Echo", "api-1");
        let id = ApiTarget::Name("Echo".to_string()).resolve(&api).await.unwrap();
        assert_eq!(id, "api-1");

        let err = ApiTarget::Name("Missing".to_string())
            .resolve(&api)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
        assert!(api.applications().is_empty());
    }
}
