//! API lookup endpoints

use crate::ManagementClient;
use crate::error::{ClientError, Result};
use provisor_core::domain::ApiRef;
use provisor_core::dto::Listing;
use tracing::debug;

impl ManagementClient {
    /// List the APIs of the environment
    pub async fn list_apis(&self) -> Result<Vec<ApiRef>> {
        let path = format!("{}/apis", self.versioned_path());
        let response = self.transport.get(&path).await?;

        let listing: Listing<ApiRef> = self.parse_json(response).await?;
        Ok(listing.into_items())
    }

    /// Resolve an API by exact name
    ///
    /// # Errors
    /// Returns `NotFound` when no API carries exactly `api_name`.
    pub async fn resolve_api(&self, api_name: &str) -> Result<ApiRef> {
        let apis = self.list_apis().await?;
        debug!("Scanning {} API(s) for '{}'", apis.len(), api_name);

        ApiRef::find_exact(&apis, api_name)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("API named '{}'", api_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RetryPolicy;
    use provisor_core::ApiVersion;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, version: ApiVersion) -> ManagementClient {
        ManagementClient::new(server.uri(), "t0k")
            .unwrap()
            .with_version(version)
            .with_retry_policy(RetryPolicy {
                max_retries: 0,
                ..RetryPolicy::default()
            })
    }

    #[tokio::test]
    async fn test_resolve_api_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/organizations/DEFAULT/environments/DEFAULT/apis"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "a1", "name": "Echo v2"},
                {"id": "a2", "name": "Echo"}
            ])))
            .mount(&server)
            .await;

        let api = client(&server, ApiVersion::V1).resolve_api("Echo").await.unwrap();
        assert_eq!(api.id, "a2");
    }

    #[tokio::test]
    async fn test_resolve_api_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/organizations/DEFAULT/environments/DEFAULT/apis"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": "a1", "name": "Echo v2"}]})),
            )
            .mount(&server)
            .await;

        let err = client(&server, ApiVersion::V2).resolve_api("Echo").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }
}
