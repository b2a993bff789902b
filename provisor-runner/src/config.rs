//! Runner configuration
//!
//! Defines all configurable parameters for a provisioning batch: where the
//! management API and gateway live, which API and plan to target, batch size,
//! and every retry and wait bound used along the way.

use std::fmt;
use std::time::Duration;

use provisor_client::gateway::DEFAULT_API_KEY_HEADER;
use provisor_client::{ProbePolicy, RetryPolicy};
use provisor_core::ApiVersion;
use provisor_core::domain::application::DEFAULT_APP_PREFIX;
use provisor_core::version::DEFAULT_SCOPE;
use thiserror::Error;

use crate::service::ApiTarget;
use crate::service::pipeline::{KeyPolicy, PlanStrategy, PollPolicy};

/// Configuration errors; all of them are fatal before any network call
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("invalid value '{value}' for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Runner configuration
///
/// Built once at startup and handed to the client, pipeline and driver.
#[derive(Clone)]
pub struct Config {
    /// Management API root (e.g., "http://localhost:8083/management")
    pub management_url: String,

    /// Administrative bearer token
    pub admin_token: String,

    /// API the applications subscribe to
    pub api: ApiTarget,

    /// Gateway entrypoint used to verify keys
    pub gateway_endpoint: String,

    /// Header carrying the API key at the gateway
    pub api_key_header: String,

    pub api_version: ApiVersion,
    pub organization: String,
    pub environment: String,

    /// Prefix of generated application names
    pub app_prefix: String,

    pub plan: PlanStrategy,
    pub keys: KeyPolicy,

    /// First sequence index of the batch
    pub start_index: u64,

    /// Number of applications to provision
    pub unit_count: u64,

    /// Maximum pipelines in flight
    pub concurrency: usize,

    pub retry: RetryPolicy,
    pub probe: ProbePolicy,

    /// Where to write the JSON batch report, if anywhere
    pub report_path: Option<String>,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(management_url: String, admin_token: String, api: ApiTarget) -> Self {
        Self {
            management_url,
            admin_token,
            api,
            gateway_endpoint: "http://localhost:8082/echo".to_string(),
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            api_version: ApiVersion::default(),
            organization: DEFAULT_SCOPE.to_string(),
            environment: DEFAULT_SCOPE.to_string(),
            app_prefix: DEFAULT_APP_PREFIX.to_string(),
            plan: PlanStrategy::Shared {
                name: "edu_nat".to_string(),
            },
            keys: KeyPolicy::Poll(PollPolicy::default()),
            start_index: 1,
            unit_count: 2,
            concurrency: 8,
            retry: RetryPolicy::default(),
            probe: ProbePolicy::default(),
            report_path: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Required: MANAGEMENT_URL (or GRAVITEE_URL), ADMIN_TOKEN, and API_ID or
    /// API_NAME (API_ID wins when both are set).
    /// Everything else falls back to the defaults of [`Config::new`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Creates configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let management_url = var("MANAGEMENT_URL")
            .or_else(|| var("GRAVITEE_URL"))
            .ok_or(ConfigError::Missing("MANAGEMENT_URL"))?;
        let admin_token = var("ADMIN_TOKEN").ok_or(ConfigError::Missing("ADMIN_TOKEN"))?;
        let api = var("API_ID")
            .map(ApiTarget::Id)
            .or_else(|| var("API_NAME").map(ApiTarget::Name))
            .ok_or(ConfigError::Missing("API_ID"))?;

        let mut config = Self::new(management_url, admin_token, api);

        if let Some(endpoint) = var("GATEWAY_ENDPOINT") {
            config.gateway_endpoint = endpoint;
        }
        if let Some(header) = var("API_KEY_HEADER") {
            config.api_key_header = header;
        }
        if let Some(version) = var("API_VERSION") {
            config.api_version = version.parse().map_err(|reason| ConfigError::Invalid {
                name: "API_VERSION",
                value: version.clone(),
                reason,
            })?;
        }
        if let Some(organization) = var("ORGANIZATION") {
            config.organization = organization;
        }
        if let Some(environment) = var("ENVIRONMENT") {
            config.environment = environment;
        }
        if let Some(prefix) = var("APP_PREFIX") {
            config.app_prefix = prefix;
        }
        config.report_path = var("REPORT_PATH");

        config.plan = parse_plan_strategy(
            var("PLAN_STRATEGY").as_deref(),
            var("PLAN_NAME").unwrap_or_else(|| "edu_nat".to_string()),
            var("PLAN_PREFIX").unwrap_or_else(|| "Plan-App-".to_string()),
        )?;

        config.start_index = parse_or(&var, "START_INDEX", config.start_index)?;
        config.unit_count = parse_or(&var, "UNIT_COUNT", config.unit_count)?;
        config.concurrency = parse_or(&var, "CONCURRENCY", config.concurrency)?;

        config.retry.max_retries = parse_or(&var, "TRANSPORT_MAX_RETRIES", config.retry.max_retries)?;
        config.retry.base_delay = millis_or(&var, "TRANSPORT_BACKOFF_MS", config.retry.base_delay)?;

        config.probe.max_attempts = parse_or(&var, "PROBE_MAX_ATTEMPTS", config.probe.max_attempts)?;
        config.probe.interval = millis_or(&var, "PROBE_INTERVAL_MS", config.probe.interval)?;

        let defaults = PollPolicy::default();
        let initial_delay = millis_or(&var, "KEY_INITIAL_DELAY_MS", defaults.initial_delay)?;
        config.keys = match var("KEY_POLICY").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("poll") => KeyPolicy::Poll(PollPolicy {
                initial_delay,
                interval: millis_or(&var, "KEY_POLL_INTERVAL_MS", defaults.interval)?,
                max_interval: defaults.max_interval,
                max_attempts: parse_or(&var, "KEY_POLL_ATTEMPTS", defaults.max_attempts)?,
                timeout: Duration::from_secs(parse_or(
                    &var,
                    "KEY_TIMEOUT_SECS",
                    defaults.timeout.as_secs(),
                )?),
            }),
            Some("fixed") => KeyPolicy::FixedWait {
                delay: initial_delay,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "KEY_POLICY",
                    value: other.to_string(),
                    reason: "expected 'poll' or 'fixed'".to_string(),
                });
            }
        };

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, url) in [
            ("MANAGEMENT_URL", &self.management_url),
            ("GATEWAY_ENDPOINT", &self.gateway_endpoint),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Invalid {
                    name,
                    value: url.clone(),
                    reason: "must start with http:// or https://".to_string(),
                });
            }
        }

        if self.concurrency == 0 {
            return Err(invalid("CONCURRENCY", "0", "must be greater than 0"));
        }

        if self.start_index.checked_add(self.unit_count).is_none() {
            return Err(invalid(
                "UNIT_COUNT",
                &self.unit_count.to_string(),
                "batch range overflows",
            ));
        }

        if self.probe.max_attempts == 0 {
            return Err(invalid("PROBE_MAX_ATTEMPTS", "0", "must be greater than 0"));
        }

        if let KeyPolicy::Poll(poll) = &self.keys {
            if poll.max_attempts == 0 {
                return Err(invalid("KEY_POLL_ATTEMPTS", "0", "must be greater than 0"));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("management_url", &self.management_url)
            .field("admin_token", &"<redacted>")
            .field("api", &self.api)
            .field("gateway_endpoint", &self.gateway_endpoint)
            .field("api_version", &self.api_version)
            .field("plan", &self.plan)
            .field("keys", &self.keys)
            .field("start_index", &self.start_index)
            .field("unit_count", &self.unit_count)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

fn invalid(name: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_or<T, F>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn millis_or<F>(var: &F, name: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(var, name, default.as_millis() as u64).map(Duration::from_millis)
}

fn parse_plan_strategy(
    strategy: Option<&str>,
    name: String,
    prefix: String,
) -> Result<PlanStrategy, ConfigError> {
    match strategy.map(str::to_ascii_lowercase).as_deref() {
        None | Some("shared") => Ok(PlanStrategy::Shared { name }),
        Some("per-unit") => Ok(PlanStrategy::PerUnit { name }),
        Some("create") => Ok(PlanStrategy::CreatePerUnit { prefix }),
        Some(other) => Err(invalid(
            "PLAN_STRATEGY",
            other,
            "expected 'shared', 'per-unit' or 'create'",
        )),
    }
}
