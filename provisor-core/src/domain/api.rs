//! API domain types

use serde::{Deserialize, Serialize};

/// Reference to an API managed by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl ApiRef {
    /// Find the API whose name is exactly `name`
    pub fn find_exact<'a>(apis: &'a [ApiRef], name: &str) -> Option<&'a ApiRef> {
        apis.iter().find(|api| api.name == name)
    }
}
