//! Plan DTOs

use serde::Serialize;

use crate::ApiVersion;

const API_KEY_SECURITY: &str = "API_KEY";

/// Request to create a plan secured by API keys
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CreatePlan {
    V1(CreatePlanV1),
    V2(CreatePlanV2),
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePlanV1 {
    pub name: String,
    pub description: String,
    pub security: String,
    pub validation: String,
    #[serde(rename = "type")]
    pub plan_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanV2 {
    pub name: String,
    pub description: String,
    pub definition_version: String,
    pub security: PlanSecurity,
    pub validation: String,
    pub mode: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanSecurity {
    #[serde(rename = "type")]
    pub security_type: String,
}

impl CreatePlan {
    /// Auto-validated API key plan named `name`
    pub fn api_key(version: ApiVersion, name: &str) -> Self {
        let description = format!("Automated plan {}", name);
        match version {
            ApiVersion::V1 => CreatePlan::V1(CreatePlanV1 {
                name: name.to_string(),
                description,
                security: API_KEY_SECURITY.to_string(),
                validation: "AUTO".to_string(),
                plan_type: "API".to_string(),
            }),
            ApiVersion::V2 => CreatePlan::V2(CreatePlanV2 {
                name: name.to_string(),
                description,
                definition_version: "V4".to_string(),
                security: PlanSecurity {
                    security_type: API_KEY_SECURITY.to_string(),
                },
                validation: "AUTO".to_string(),
                mode: "STANDARD".to_string(),
            }),
        }
    }
}
