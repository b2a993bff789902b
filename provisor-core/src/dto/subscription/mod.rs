//! Subscription DTOs

use serde::{Deserialize, Serialize};

use crate::ApiVersion;

/// Request to subscribe an application to a plan
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CreateSubscription {
    V1 {
        application: String,
        plan: String,
        request: String,
    },
    #[serde(rename_all = "camelCase")]
    V2 {
        application_id: String,
        plan_id: String,
        request: String,
    },
}

impl CreateSubscription {
    pub fn new(version: ApiVersion, application_id: &str, plan_id: &str) -> Self {
        let request = format!(
            "Automated subscription for app {} on plan {}",
            application_id, plan_id
        );
        match version {
            ApiVersion::V1 => CreateSubscription::V1 {
                application: application_id.to_string(),
                plan: plan_id.to_string(),
                request,
            },
            ApiVersion::V2 => CreateSubscription::V2 {
                application_id: application_id.to_string(),
                plan_id: plan_id.to_string(),
                request,
            },
        }
    }
}

/// Identifier returned by create endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Created {
    pub id: String,
}

/// Entry of a subscription listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionSummary {
    pub id: String,
    #[serde(default)]
    pub application: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
}

/// Entry of an API key listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyEntry {
    pub key: String,
    #[serde(default)]
    pub revoked: bool,
}
