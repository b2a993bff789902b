//! Subscription and API key domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription binding one application to one plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub id: String,
    pub application_id: String,
    pub plan_id: String,
}

/// API key issued for a subscription
///
/// The secret is kept out of `Debug` output so it never lands in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The secret value
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short, log-safe form of the key
    pub fn masked(&self) -> String {
        let visible: String = self.0.chars().take(4).collect();
        format!("{}****", visible)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.masked())
    }
}
