//! Group assignment endpoints
//!
//! Two ways exist to put an application in a group: the dedicated membership
//! endpoint, or rewriting the application definition with the group added.

use crate::ManagementClient;
use crate::error::{ClientError, Result};
use provisor_core::dto::application::GroupMembership;
use serde_json::Value as JsonValue;

impl ManagementClient {
    /// Add an application to a group through the membership endpoint
    pub async fn add_group_member(&self, group_id: &str, application_id: &str) -> Result<()> {
        let path = format!("{}/groups/{}/memberships", self.v1_path(), group_id);
        let body = GroupMembership {
            application_id: application_id.to_string(),
        };
        self.transport.post(&path, &body).await?;
        Ok(())
    }

    /// Add a group to an application by updating its definition
    ///
    /// # Returns
    /// `false` if the application already belonged to the group, in which case
    /// nothing is written.
    pub async fn assign_group_by_update(&self, application_id: &str, group_id: &str) -> Result<bool> {
        let mut definition = self.get_application(application_id).await?;
        if !add_group(&mut definition, group_id)? {
            return Ok(false);
        }

        self.update_application(application_id, &definition).await?;
        Ok(true)
    }
}

/// Insert `group_id` into the definition's `groups` array
///
/// Returns whether the definition changed.
fn add_group(definition: &mut JsonValue, group_id: &str) -> Result<bool> {
    let object = definition
        .as_object_mut()
        .ok_or_else(|| ClientError::ParseError("application definition is not an object".into()))?;

    let groups = object
        .entry("groups")
        .or_insert_with(|| JsonValue::Array(Vec::new()));
    if groups.is_null() {
        *groups = JsonValue::Array(Vec::new());
    }

    let groups = groups
        .as_array_mut()
        .ok_or_else(|| ClientError::ParseError("application groups is not an array".into()))?;

    if groups.iter().any(|g| g.as_str() == Some(group_id)) {
        return Ok(false);
    }

    groups.push(JsonValue::String(group_id.to_string()));
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RetryPolicy;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const APP: &str = "/organizations/DEFAULT/environments/DEFAULT/applications/a1";

    #[test]
    fn test_add_group_variants() {
        let mut missing = json!({"id": "a1"});
        assert!(add_group(&mut missing, "g1").unwrap());
        assert_eq!(missing["groups"], json!(["g1"]));

        let mut present = json!({"groups": ["g1"]});
        assert!(!add_group(&mut present, "g1").unwrap());

        let mut null_groups = json!({"groups": null});
        assert!(add_group(&mut null_groups, "g2").unwrap());
        assert_eq!(null_groups["groups"], json!(["g2"]));

        assert!(add_group(&mut json!([]), "g1").is_err());
    }

    #[tokio::test]
    async fn test_assign_group_by_update_puts_definition() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(APP))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "a1", "name": "AutomatedApp-1", "groups": ["g0"]
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(APP))
            .and(body_json(json!({"id": "a1", "name": "AutomatedApp-1", "groups": ["g0", "g1"]})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = ManagementClient::new(server.uri(), "t0k")
            .unwrap()
            .with_retry_policy(RetryPolicy {
                max_retries: 0,
                ..RetryPolicy::default()
            });
        assert!(client.assign_group_by_update("a1", "g1").await.unwrap());
    }

    #[tokio::test]
    async fn test_add_group_member_posts_membership() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/organizations/DEFAULT/environments/DEFAULT/groups/g1/memberships"))
            .and(body_json(json!({"applicationId": "a1"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = ManagementClient::new(server.uri(), "t0k").unwrap();
        client.add_group_member("g1", "a1").await.unwrap();
    }

    #[tokio::test]
    async fn test_assign_group_by_update_skips_existing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(APP))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "a1", "groups": ["g1"]})))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(APP))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = ManagementClient::new(server.uri(), "t0k").unwrap();
        assert!(!client.assign_group_by_update("a1", "g1").await.unwrap());
    }
}
