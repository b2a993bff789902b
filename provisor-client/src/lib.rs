//! Provisor HTTP Client
//!
//! A typed client for the API-management platform's administrative REST
//! interface and for the gateway it configures.
//!
//! This crate provides one interface for both the bulk provisioning runner and
//! the cleanup CLI, so they share the same retry policy, paths and DTOs.
//!
//! # Example
//!
//! ```no_run
//! use provisor_client::ManagementClient;
//! use provisor_core::ApiVersion;
//! use provisor_core::domain::ApplicationSpec;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ManagementClient::new("http://localhost:8083/management", "admin-token")?
//!         .with_version(ApiVersion::V2);
//!
//!     let app = client
//!         .create_application(&ApplicationSpec::for_index("AutomatedApp-", 1))
//!         .await?;
//!
//!     println!("Created application: {}", app.id);
//!     Ok(())
//! }
//! ```

mod apis;
mod applications;
pub mod error;
pub mod gateway;
mod groups;
mod plans;
mod subscriptions;
pub mod transport;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use gateway::{GatewayClient, ProbePolicy, ProbeResponse};
pub use transport::{RetryPolicy, Transport};

use provisor_core::ApiVersion;
use provisor_core::version::DEFAULT_SCOPE;
use serde::de::DeserializeOwned;

/// HTTP client for the management API
///
/// Methods are organized into logical groups:
/// - APIs (list, resolve by name)
/// - Applications (create, list, get, update, delete)
/// - Plans (list, resolve by name, create and publish, delete)
/// - Subscriptions and their API keys
/// - Group assignment
#[derive(Debug, Clone)]
pub struct ManagementClient {
    transport: Transport,
    version: ApiVersion,
    organization: String,
    environment: String,
}

impl ManagementClient {
    /// Create a new management client with the default retry policy
    ///
    /// # Arguments
    /// * `base_url` - Management API root (e.g., "http://localhost:8083/management")
    /// * `token` - Administrative bearer token
    pub fn new(base_url: impl Into<String>, token: &str) -> Result<Self> {
        let transport = Transport::new(base_url, token, RetryPolicy::default())?;
        Ok(Self::with_transport(transport))
    }

    /// Create a client over an existing transport
    pub fn with_transport(transport: Transport) -> Self {
        Self {
            transport,
            version: ApiVersion::default(),
            organization: DEFAULT_SCOPE.to_string(),
            environment: DEFAULT_SCOPE.to_string(),
        }
    }

    /// Select the management API shape
    pub fn with_version(mut self, version: ApiVersion) -> Self {
        self.version = version;
        self
    }

    /// Select the organization and environment
    pub fn with_scope(mut self, organization: impl Into<String>, environment: impl Into<String>) -> Self {
        self.organization = organization.into();
        self.environment = environment.into();
        self
    }

    /// Replace the transport's retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.transport = self.transport.with_policy(policy);
        self
    }

    /// Get the base URL of the management API
    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    /// Get the API shape this client speaks
    pub fn version(&self) -> ApiVersion {
        self.version
    }

    /// Prefix for resources that only exist in the v1 shape
    fn v1_path(&self) -> String {
        ApiVersion::V1.environment_path(&self.organization, &self.environment)
    }

    /// Prefix for resources whose shape follows the configured version
    fn versioned_path(&self) -> String {
        self.version
            .environment_path(&self.organization, &self.environment)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Deserialize a successful response body
    ///
    /// The transport has already turned non-success statuses into errors.
    async fn parse_json<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
