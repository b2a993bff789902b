//! Application DTOs

use serde::{Deserialize, Serialize};

/// Body for adding an application to a group
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMembership {
    pub application_id: String,
}
