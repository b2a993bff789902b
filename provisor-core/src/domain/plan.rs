//! Plan domain types

use serde::{Deserialize, Serialize};

/// Reference to a subscription plan of an API
///
/// Either resolved by name among existing plans or freshly created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl PlanRef {
    /// Find the plan whose name is exactly `name`
    ///
    /// Plans sharing a prefix with `name` never match.
    pub fn find_exact<'a>(plans: &'a [PlanRef], name: &str) -> Option<&'a PlanRef> {
        plans.iter().find(|plan| plan.name == name)
    }
}
