//! Gateway verification probe
//!
//! A freshly issued key can take a moment to become valid at the gateway, so
//! the probe tolerates 401 responses for a bounded number of attempts. Any
//! other error status fails the probe at once.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use provisor_core::domain::ApiKey;

/// Header the gateway reads API keys from by default
pub const DEFAULT_API_KEY_HEADER: &str = "X-Gravitee-Api-Key";

/// Retry bounds for 401 responses
#[derive(Debug, Clone)]
pub struct ProbePolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub interval: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            interval: Duration::from_millis(500),
        }
    }
}

/// Successful probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    /// Attempts it took, 1 when the key worked straight away
    pub attempts: u32,
}

/// Client for the gateway endpoint protected by the provisioned plan
///
/// Deliberately separate from the management transport: it carries no admin
/// credential and has its own retry policy.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    endpoint: String,
    key_header: String,
    client: Client,
    policy: ProbePolicy,
}

impl GatewayClient {
    /// Create a gateway client for `endpoint`
    ///
    /// # Arguments
    /// * `endpoint` - Full URL of the gateway entrypoint (e.g., "http://localhost:8082/echo")
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            key_header: DEFAULT_API_KEY_HEADER.to_string(),
            client: Client::new(),
            policy: ProbePolicy::default(),
        }
    }

    /// Use `header` to carry the API key
    pub fn with_key_header(mut self, header: impl Into<String>) -> Self {
        self.key_header = header.into();
        self
    }

    pub fn with_policy(mut self, policy: ProbePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Call the gateway with `api_key`
    ///
    /// # Errors
    /// - `ProbeExhausted` if every attempt got 401
    /// - `ProbeRejected` on the first non-401 error status
    /// - `RequestFailed` if the gateway cannot be reached
    pub async fn probe(&self, api_key: &ApiKey) -> Result<ProbeResponse> {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let response = self
                .client
                .get(&self.endpoint)
                .header(self.key_header.as_str(), api_key.expose())
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .send()
                .await?;
            let status = response.status();

            if status.is_success() {
                debug!(
                    "Gateway accepted key {} on attempt {}",
                    api_key.masked(),
                    attempt
                );
                return Ok(ProbeResponse {
                    status: status.as_u16(),
                    attempts: attempt,
                });
            }

            if status != StatusCode::UNAUTHORIZED {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(ClientError::ProbeRejected {
                    status: status.as_u16(),
                    message,
                });
            }

            if attempt < max_attempts {
                warn!(
                    "Gateway returned 401 for key {}, retrying ({}/{})",
                    api_key.masked(),
                    attempt,
                    max_attempts
                );
                tokio::time::sleep(self.policy.interval).await;
            }
        }

        Err(ClientError::ProbeExhausted {
            attempts: max_attempts,
        })
    }
}
