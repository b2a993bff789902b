//! In-memory ProvisioningApi for tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use provisor_client::{ClientError, ProbeResponse, Result};
use provisor_core::domain::{ApiKey, ApiRef, ApplicationRecord, ApplicationSpec, PlanRef, SubscriptionRecord};

use super::ProvisioningApi;
use super::pipeline::{KeyPolicy, PipelineSettings, PlanStrategy, PollPolicy};

pub(crate) fn settings(plan: PlanStrategy) -> PipelineSettings {
    PipelineSettings {
        api_id: "api-1".to_string(),
        app_prefix: "AutomatedApp-".to_string(),
        plan,
        keys: fast_poll(3),
    }
}

pub(crate) fn fast_poll(max_attempts: u32) -> KeyPolicy {
    KeyPolicy::Poll(PollPolicy {
        initial_delay: Duration::from_millis(1),
        interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(2),
        max_attempts,
        timeout: Duration::from_secs(5),
    })
}

/// Fake platform: every call succeeds unless scripted otherwise
///
/// Tracks how many calls are in flight at once; each call holds its slot for
/// `call_delay`.
#[derive(Default)]
pub(crate) struct FakeApi {
    call_delay: Duration,
    empty_key_fetches: usize,
    missing_plan_calls: HashSet<usize>,
    probe_rejection: Option<u16>,
    apis: Vec<ApiRef>,

    next_id: AtomicUsize,
    api_lookups: AtomicUsize,
    plan_calls: AtomicUsize,
    key_fetches: AtomicUsize,
    probes: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fetches_per_subscription: Mutex<HashMap<String, usize>>,
    created_plans: Mutex<Vec<String>>,
    applications: Mutex<Vec<ApplicationRecord>>,
}

impl FakeApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    /// Each subscription returns no keys for its first `n` fetches
    pub(crate) fn with_empty_key_fetches(mut self, n: usize) -> Self {
        self.empty_key_fetches = n;
        self
    }

    /// Plan resolution fails with NotFound on these 1-based call numbers
    pub(crate) fn with_missing_plan_on_calls(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.missing_plan_calls = calls.into_iter().collect();
        self
    }

    pub(crate) fn with_probe_rejection(mut self, status: u16) -> Self {
        self.probe_rejection = Some(status);
        self
    }

    pub(crate) fn with_api(mut self, name: &str, id: &str) -> Self {
        self.apis.push(ApiRef {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub(crate) fn api_lookups(&self) -> usize {
        self.api_lookups.load(Ordering::SeqCst)
    }

    pub(crate) fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub(crate) fn key_fetches(&self) -> usize {
        self.key_fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn plan_resolutions(&self) -> usize {
        self.plan_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn created_plans(&self) -> Vec<String> {
        self.created_plans.lock().unwrap().clone()
    }

    pub(crate) fn applications(&self) -> Vec<ApplicationRecord> {
        self.applications.lock().unwrap().clone()
    }

    fn next_id(&self, kind: &str) -> String {
        format!("{}-{}", kind, self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn call(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.call_delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProvisioningApi for FakeApi {
    async fn resolve_api(&self, api_name: &str) -> Result<ApiRef> {
        self.call().await;
        self.api_lookups.fetch_add(1, Ordering::SeqCst);
        ApiRef::find_exact(&self.apis, api_name)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("API named '{}'", api_name)))
    }

    async fn create_application(&self, spec: &ApplicationSpec) -> Result<ApplicationRecord> {
        self.call().await;
        let record = ApplicationRecord {
            id: self.next_id("app"),
            name: spec.name.clone(),
        };
        self.applications.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn resolve_plan(&self, api_id: &str, plan_name: &str) -> Result<PlanRef> {
        self.call().await;
        let call = self.plan_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.missing_plan_calls.contains(&call) {
            return Err(ClientError::NotFound(format!(
                "plan '{}' for API {}",
                plan_name, api_id
            )));
        }
        Ok(PlanRef {
            id: format!("plan-{}", plan_name),
            name: plan_name.to_string(),
        })
    }

    async fn create_plan(&self, _api_id: &str, plan_name: &str) -> Result<PlanRef> {
        self.call().await;
        self.created_plans.lock().unwrap().push(plan_name.to_string());
        Ok(PlanRef {
            id: self.next_id("plan"),
            name: plan_name.to_string(),
        })
    }

    async fn create_subscription(
        &self,
        _api_id: &str,
        application_id: &str,
        plan_id: &str,
    ) -> Result<SubscriptionRecord> {
        self.call().await;
        Ok(SubscriptionRecord {
            id: self.next_id("sub"),
            application_id: application_id.to_string(),
            plan_id: plan_id.to_string(),
        })
    }

    async fn fetch_api_keys(&self, _api_id: &str, subscription_id: &str) -> Result<Vec<ApiKey>> {
        self.call().await;
        self.key_fetches.fetch_add(1, Ordering::SeqCst);

        let mut fetches = self.fetches_per_subscription.lock().unwrap();
        let seen = fetches.entry(subscription_id.to_string()).or_insert(0);
        *seen += 1;

        if *seen <= self.empty_key_fetches {
            return Ok(Vec::new());
        }
        Ok(vec![ApiKey::new(format!("key-{}", subscription_id))])
    }

    async fn probe(&self, _api_key: &ApiKey) -> Result<ProbeResponse> {
        self.call().await;
        self.probes.fetch_add(1, Ordering::SeqCst);

        match self.probe_rejection {
            Some(status) => Err(ClientError::ProbeRejected {
                status,
                message: "rejected".to_string(),
            }),
            None => Ok(ProbeResponse {
                status: 200,
                attempts: 1,
            }),
        }
    }
}
