//! Application domain types

use serde::{Deserialize, Serialize};

/// Default prefix for generated application names
pub const DEFAULT_APP_PREFIX: &str = "AutomatedApp-";

/// Application type sent on creation
pub const SIMPLE_APPLICATION: &str = "SIMPLE";

/// Application to be created for one unit of work
///
/// Built by the driver from a sequence index; it has no lifecycle of its own
/// once the remote record comes back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSpec {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub app_type: String,
}

impl ApplicationSpec {
    /// Build the spec for sequence index `index` using `prefix`
    pub fn for_index(prefix: &str, index: u64) -> Self {
        let name = format!("{}{}", prefix, index);
        Self {
            description: format!("Automated app {}", name),
            name,
            app_type: SIMPLE_APPLICATION.to_string(),
        }
    }
}

/// Application as returned by the management API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
}
