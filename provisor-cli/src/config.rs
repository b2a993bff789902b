//! Configuration module
//!
//! Handles CLI configuration: where the management API lives and how to
//! authenticate against it.

use anyhow::{Context, Result};
use provisor_client::ManagementClient;
use provisor_core::ApiVersion;

/// CLI configuration
#[derive(Clone)]
pub struct Config {
    /// Management API root
    pub management_url: String,

    /// Administrative bearer token
    pub admin_token: String,

    pub api_version: ApiVersion,
    pub organization: String,
    pub environment: String,
}

impl Config {
    /// Build a management client from this configuration
    pub fn client(&self) -> Result<ManagementClient> {
        let client = ManagementClient::new(self.management_url.clone(), &self.admin_token)
            .context("Failed to build management client")?
            .with_version(self.api_version)
            .with_scope(self.organization.clone(), self.environment.clone());
        Ok(client)
    }
}
