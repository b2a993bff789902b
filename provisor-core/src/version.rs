//! Management API versions
//!
//! The platform exposes two shapes of its management API. Both share the
//! organization/environment scoping; they differ in path prefix and in a few
//! request/response bodies (see `crate::dto`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Organization and environment used when none is configured
pub const DEFAULT_SCOPE: &str = "DEFAULT";

/// Shape of the management API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    V1,
    #[default]
    V2,
}

impl ApiVersion {
    /// Path prefix for environment-scoped resources of this version
    ///
    /// # Example
    /// ```
    /// use provisor_core::ApiVersion;
    ///
    /// assert_eq!(
    ///     ApiVersion::V2.environment_path("DEFAULT", "DEFAULT"),
    ///     "/v2/organizations/DEFAULT/environments/DEFAULT"
    /// );
    /// ```
    pub fn environment_path(&self, organization: &str, environment: &str) -> String {
        let version = match self {
            ApiVersion::V1 => "",
            ApiVersion::V2 => "/v2",
        };
        format!(
            "{}/organizations/{}/environments/{}",
            version, organization, environment
        )
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiVersion::V1 => f.write_str("v1"),
            ApiVersion::V2 => f.write_str("v2"),
        }
    }
}

impl FromStr for ApiVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(ApiVersion::V1),
            "v2" | "2" | "v4" => Ok(ApiVersion::V2),
            other => Err(format!("unknown API version '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_path() {
        assert_eq!(
            ApiVersion::V1.environment_path("DEFAULT", "DEFAULT"),
            "/organizations/DEFAULT/environments/DEFAULT"
        );
        assert_eq!(
            ApiVersion::V2.environment_path("org", "env"),
            "/v2/organizations/org/environments/env"
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!("v1".parse::<ApiVersion>().unwrap(), ApiVersion::V1);
        assert_eq!("V2".parse::<ApiVersion>().unwrap(), ApiVersion::V2);
        assert_eq!("v4".parse::<ApiVersion>().unwrap(), ApiVersion::V2);
        assert!("v3".parse::<ApiVersion>().is_err());
    }
}
