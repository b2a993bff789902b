//! Provisioning pipeline
//!
//! Runs one unit of work end to end:
//! - create the application
//! - bind a plan (shared, resolved per unit, or created per unit)
//! - subscribe the application to the plan
//! - wait for the subscription's API key to be issued
//! - verify the key against the gateway
//!
//! A failing step ends the unit's run. Nothing already created is rolled
//! back; the failure carries every id obtained so far so cleanup can find it.

use std::sync::Arc;
use std::time::Duration;

use provisor_client::ClientError;
use provisor_core::domain::{ApiKey, ApplicationSpec, PipelineState, PlanRef};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::ProvisioningApi;

/// How each unit obtains its plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStrategy {
    /// Resolve `name` once per batch and share it
    Shared { name: String },
    /// Resolve `name` in every unit
    PerUnit { name: String },
    /// Create and publish `{prefix}{index}` in every unit
    CreatePerUnit { prefix: String },
}

/// Bounded polling for a subscription's key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait before the first fetch
    pub initial_delay: Duration,
    /// Wait between fetches, doubled after each empty result
    pub interval: Duration,
    pub max_interval: Duration,
    pub max_attempts: u32,
    /// Overall bound, measured from the first fetch
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(5),
            max_attempts: 10,
            timeout: Duration::from_secs(30),
        }
    }
}

/// How the pipeline waits for a key after subscribing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPolicy {
    /// Sleep once, fetch once
    FixedWait { delay: Duration },
    /// Sleep, then poll until a key shows up
    Poll(PollPolicy),
}

/// Why a step failed
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("no API key issued for the subscription")]
    EmptyKeys,

    #[error("no API key issued after {attempts} fetch(es) in {elapsed:?}")]
    KeyTimeout { attempts: u32, elapsed: Duration },

    #[error("unit aborted: {0}")]
    Aborted(String),
}

/// Identifying data of one unit, filled in as steps complete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitIds {
    pub index: u64,
    pub name: String,
    pub application_id: Option<String>,
    pub plan_id: Option<String>,
    pub subscription_id: Option<String>,
}

/// A unit that stopped before `Done`
#[derive(Debug, Error)]
#[error("{} failed at {state}: {cause}", .unit.name)]
pub struct PipelineFailure {
    /// The state the unit did not reach
    pub state: PipelineState,
    pub cause: StepError,
    pub unit: UnitIds,
}

/// Final result of one unit
#[derive(Debug)]
pub enum RunOutcome {
    Done(UnitIds),
    Failed(PipelineFailure),
}

impl RunOutcome {
    pub fn index(&self) -> u64 {
        self.unit().index
    }

    pub fn unit(&self) -> &UnitIds {
        match self {
            RunOutcome::Done(unit) => unit,
            RunOutcome::Failed(failure) => &failure.unit,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, RunOutcome::Done(_))
    }

    pub fn failure(&self) -> Option<&PipelineFailure> {
        match self {
            RunOutcome::Done(_) => None,
            RunOutcome::Failed(failure) => Some(failure),
        }
    }

    /// Outcome for a unit whose task died before reporting
    pub fn aborted(unit: UnitIds, reason: impl Into<String>) -> Self {
        RunOutcome::Failed(PipelineFailure {
            state: PipelineState::Created,
            cause: StepError::Aborted(reason.into()),
            unit,
        })
    }
}

/// Settings shared by every unit of a batch
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub api_id: String,
    pub app_prefix: String,
    pub plan: PlanStrategy,
    pub keys: KeyPolicy,
}

/// Provisioning pipeline
///
/// Cheap to clone; clones share the API handle, settings and shared plan.
#[derive(Clone)]
pub struct Pipeline {
    api: Arc<dyn ProvisioningApi>,
    settings: Arc<PipelineSettings>,
    shared_plan: Option<Arc<PlanRef>>,
}

type StepResult<T> = std::result::Result<T, (PipelineState, StepError)>;

impl Pipeline {
    pub fn new(api: Arc<dyn ProvisioningApi>, settings: PipelineSettings) -> Self {
        Self {
            api,
            settings: Arc::new(settings),
            shared_plan: None,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Whether the plan must be bound once before the batch starts
    pub fn needs_shared_plan(&self) -> bool {
        matches!(self.settings.plan, PlanStrategy::Shared { .. }) && self.shared_plan.is_none()
    }

    /// Resolve the shared plan, for the `Shared` strategy
    pub async fn resolve_shared_plan(&self) -> Result<PlanRef, ClientError> {
        match &self.settings.plan {
            PlanStrategy::Shared { name } => self.api.resolve_plan(&self.settings.api_id, name).await,
            other => Err(ClientError::InvalidRequest(format!(
                "plan strategy {:?} does not share a plan",
                other
            ))),
        }
    }

    /// Use `plan` for every unit run by this pipeline and its clones
    pub fn with_shared_plan(mut self, plan: PlanRef) -> Self {
        self.shared_plan = Some(Arc::new(plan));
        self
    }

    /// Spec of the application unit `index` creates
    pub fn application_spec(&self, index: u64) -> ApplicationSpec {
        ApplicationSpec::for_index(&self.settings.app_prefix, index)
    }

    /// Run unit `index` to a terminal state
    pub async fn run(&self, index: u64) -> RunOutcome {
        let spec = self.application_spec(index);
        let mut unit = UnitIds {
            index,
            name: spec.name.clone(),
            ..UnitIds::default()
        };

        match self.provision(&spec, &mut unit).await {
            Ok(()) => {
                info!("{} provisioned and verified", unit.name);
                RunOutcome::Done(unit)
            }
            Err((state, cause)) => {
                error!("{} failed at {}: {}", unit.name, state, cause);
                RunOutcome::Failed(PipelineFailure { state, cause, unit })
            }
        }
    }

    async fn provision(&self, spec: &ApplicationSpec, unit: &mut UnitIds) -> StepResult<()> {
        let api_id = self.settings.api_id.as_str();

        let application = self
            .api
            .create_application(spec)
            .await
            .map_err(|e| (PipelineState::Created, StepError::Client(e)))?;
        unit.application_id = Some(application.id.clone());

        let plan = self
            .bind_plan(unit.index)
            .await
            .map_err(|e| (PipelineState::PlanBound, e))?;
        unit.plan_id = Some(plan.id.clone());

        let subscription = self
            .api
            .create_subscription(api_id, &application.id, &plan.id)
            .await
            .map_err(|e| (PipelineState::Subscribed, StepError::Client(e)))?;
        unit.subscription_id = Some(subscription.id.clone());

        let key = self
            .await_key(&subscription.id)
            .await
            .map_err(|e| (PipelineState::KeyAwaited, e))?;

        let response = self
            .api
            .probe(&key)
            .await
            .map_err(|e| (PipelineState::Verified, StepError::Client(e)))?;
        debug!(
            "{} verified with status {} after {} attempt(s)",
            unit.name, response.status, response.attempts
        );

        Ok(())
    }

    async fn bind_plan(&self, index: u64) -> Result<PlanRef, StepError> {
        let api_id = self.settings.api_id.as_str();

        let plan = match &self.settings.plan {
            PlanStrategy::Shared { name } => match &self.shared_plan {
                Some(plan) => plan.as_ref().clone(),
                None => self.api.resolve_plan(api_id, name).await?,
            },
            PlanStrategy::PerUnit { name } => self.api.resolve_plan(api_id, name).await?,
            PlanStrategy::CreatePerUnit { prefix } => {
                let name = format!("{}{}", prefix, index);
                self.api.create_plan(api_id, &name).await?
            }
        };

        Ok(plan)
    }

    async fn await_key(&self, subscription_id: &str) -> Result<ApiKey, StepError> {
        let api_id = self.settings.api_id.as_str();

        match &self.settings.keys {
            KeyPolicy::FixedWait { delay } => {
                tokio::time::sleep(*delay).await;
                let keys = self.api.fetch_api_keys(api_id, subscription_id).await?;
                keys.into_iter().next().ok_or(StepError::EmptyKeys)
            }
            KeyPolicy::Poll(policy) => {
                tokio::time::sleep(policy.initial_delay).await;

                let started = Instant::now();
                let deadline = started + policy.timeout;
                let mut interval = policy.interval;
                let max_attempts = policy.max_attempts.max(1);

                for attempt in 1..=max_attempts {
                    let keys = self.api.fetch_api_keys(api_id, subscription_id).await?;
                    if let Some(key) = keys.into_iter().next() {
                        return Ok(key);
                    }

                    let now = Instant::now();
                    if attempt == max_attempts || now >= deadline {
                        return Err(StepError::KeyTimeout {
                            attempts: attempt,
                            elapsed: now - started,
                        });
                    }

                    warn!(
                        "No key yet for subscription {}, polling again in {:?} ({}/{})",
                        subscription_id, interval, attempt, max_attempts
                    );
                    tokio::time::sleep(interval.min(deadline - now)).await;
                    interval = interval.saturating_mul(2).min(policy.max_interval);
                }

                Err(StepError::KeyTimeout {
                    attempts: max_attempts,
                    elapsed: started.elapsed(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::{FakeApi, fast_poll, settings};

    #[tokio::test]
    async fn test_unit_reaches_done() {
        let api = Arc::new(FakeApi::new());
        let pipeline = Pipeline::new(api.clone(), settings(PlanStrategy::PerUnit {
            name: "edu_nat".to_string(),
        }));

        let outcome = pipeline.run(5).await;

        let unit = match outcome {
            RunOutcome::Done(unit) => unit,
            RunOutcome::Failed(failure) => panic!("unexpected failure: {failure}"),
        };
        assert_eq!(unit.index, 5);
        assert_eq!(unit.name, "AutomatedApp-5");
        assert_eq!(unit.plan_id.as_deref(), Some("plan-edu_nat"));
        assert!(unit.application_id.is_some());
        assert!(unit.subscription_id.is_some());
        assert_eq!(api.probes(), 1);
    }

    #[tokio::test]
    async fn test_created_plan_is_named_after_index() {
        let api = Arc::new(FakeApi::new());
        let pipeline = Pipeline::new(api.clone(), settings(PlanStrategy::CreatePerUnit {
            prefix: "Plan-App-".to_string(),
        }));

        let outcome = pipeline.run(3).await;

        assert!(outcome.is_done());
        assert_eq!(api.created_plans(), vec!["Plan-App-3".to_string()]);
    }

    #[tokio::test]
    async fn test_shared_plan_is_not_resolved_again() {
        let api = Arc::new(FakeApi::new());
        let pipeline = Pipeline::new(api.clone(), settings(PlanStrategy::Shared {
            name: "edu_nat".to_string(),
        }))
        .with_shared_plan(PlanRef {
            id: "shared".to_string(),
            name: "edu_nat".to_string(),
        });

        let outcome = pipeline.run(1).await;

        assert_eq!(outcome.unit().plan_id.as_deref(), Some("shared"));
        assert_eq!(api.plan_resolutions(), 0);
    }

    #[tokio::test]
    async fn test_polling_waits_for_late_key() {
        let api = Arc::new(FakeApi::new().with_empty_key_fetches(1));
        let mut s = settings(PlanStrategy::PerUnit {
            name: "edu_nat".to_string(),
        });
        s.keys = fast_poll(5);
        let pipeline = Pipeline::new(api.clone(), s);

        let outcome = pipeline.run(1).await;

        assert!(outcome.is_done());
        assert_eq!(api.key_fetches(), 2);
    }

    #[tokio::test]
    async fn test_fixed_wait_fails_on_late_key() {
        let api = Arc::new(FakeApi::new().with_empty_key_fetches(1));
        let mut s = settings(PlanStrategy::PerUnit {
            name: "edu_nat".to_string(),
        });
        s.keys = KeyPolicy::FixedWait {
            delay: Duration::from_millis(1),
        };
        let pipeline = Pipeline::new(api.clone(), s);

        let failure = match pipeline.run(1).await {
            RunOutcome::Failed(failure) => failure,
            RunOutcome::Done(_) => panic!("expected failure"),
        };

        assert_eq!(failure.state, PipelineState::KeyAwaited);
        assert!(matches!(failure.cause, StepError::EmptyKeys));
        assert!(failure.unit.subscription_id.is_some());
        assert_eq!(api.probes(), 0);
    }

    #[tokio::test]
    async fn test_polling_gives_up() {
        let api = Arc::new(FakeApi::new().with_empty_key_fetches(10));
        let mut s = settings(PlanStrategy::PerUnit {
            name: "edu_nat".to_string(),
        });
        s.keys = fast_poll(3);
        let pipeline = Pipeline::new(api.clone(), s);

        let failure = match pipeline.run(1).await {
            RunOutcome::Failed(failure) => failure,
            RunOutcome::Done(_) => panic!("expected failure"),
        };

        assert_eq!(failure.state, PipelineState::KeyAwaited);
        assert!(matches!(failure.cause, StepError::KeyTimeout { attempts: 3, .. }));
        assert_eq!(api.key_fetches(), 3);
    }

    #[tokio::test]
    async fn test_failure_keeps_application_id_for_cleanup() {
        let api = Arc::new(FakeApi::new().with_missing_plan_on_calls([1]));
        let pipeline = Pipeline::new(api.clone(), settings(PlanStrategy::PerUnit {
            name: "edu_nat".to_string(),
        }));

        let failure = match pipeline.run(9).await {
            RunOutcome::Failed(failure) => failure,
            RunOutcome::Done(_) => panic!("expected failure"),
        };

        assert_eq!(failure.state, PipelineState::PlanBound);
        assert!(matches!(
            failure.cause,
            StepError::Client(ClientError::NotFound(_))
        ));
        assert!(failure.unit.application_id.is_some());
        assert!(failure.unit.subscription_id.is_none());
        assert!(failure.to_string().contains("AutomatedApp-9 failed at plan-bound"));
    }

    #[tokio::test]
    async fn test_rejected_probe_fails_verification() {
        let api = Arc::new(FakeApi::new().with_probe_rejection(403));
        let pipeline = Pipeline::new(api.clone(), settings(PlanStrategy::PerUnit {
            name: "edu_nat".to_string(),
        }));

        let failure = match pipeline.run(2).await {
            RunOutcome::Failed(failure) => failure,
            RunOutcome::Done(_) => panic!("expected failure"),
        };

        assert_eq!(failure.state, PipelineState::Verified);
        assert!(matches!(
            failure.cause,
            StepError::Client(ClientError::ProbeRejected { status: 403, .. })
        ));
    }
}
