//! Application endpoints

use crate::ManagementClient;
use crate::error::Result;
use provisor_core::domain::{ApplicationRecord, ApplicationSpec};
use provisor_core::dto::Listing;
use serde_json::Value as JsonValue;
use tracing::info;

impl ManagementClient {
    // =============================================================================
    // Application Lifecycle
    // =============================================================================

    /// Create an application
    ///
    /// Not idempotent: calling twice with the same spec creates two
    /// applications. Callers pick unique names.
    pub async fn create_application(&self, spec: &ApplicationSpec) -> Result<ApplicationRecord> {
        let path = format!("{}/applications", self.v1_path());
        let response = self.transport.post(&path, spec).await?;

        let mut record: ApplicationRecord = self.parse_json(response).await?;
        if record.name.is_empty() {
            record.name = spec.name.clone();
        }

        info!("Created application {} ({})", record.name, record.id);
        Ok(record)
    }

    /// List all applications visible to the token
    pub async fn list_applications(&self) -> Result<Vec<ApplicationRecord>> {
        let path = format!("{}/applications", self.v1_path());
        let response = self.transport.get(&path).await?;

        let listing: Listing<ApplicationRecord> = self.parse_json(response).await?;
        Ok(listing.into_items())
    }

    /// Get the full remote definition of an application
    ///
    /// Returned untyped so that it can be sent back unchanged on update.
    pub async fn get_application(&self, application_id: &str) -> Result<JsonValue> {
        let path = format!("{}/applications/{}", self.v1_path(), application_id);
        let response = self.transport.get(&path).await?;

        self.parse_json(response).await
    }

    /// Replace an application's definition
    pub async fn update_application(&self, application_id: &str, body: &JsonValue) -> Result<()> {
        let path = format!("{}/applications/{}", self.v1_path(), application_id);
        self.transport.put(&path, body).await?;
        Ok(())
    }

    /// Delete an application
    pub async fn delete_application(&self, application_id: &str) -> Result<()> {
        let path = format!("{}/applications/{}", self.v1_path(), application_id);
        self.transport.delete(&path).await?;
        Ok(())
    }
}
