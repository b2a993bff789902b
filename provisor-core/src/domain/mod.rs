//! Core domain types
//!
//! Minimal local records of remote resources. Each pipeline run owns the
//! application, subscription and key it creates; only a `PlanRef` may be
//! shared, read-only, between runs of one batch.

pub mod api;
pub mod application;
pub mod plan;
pub mod state;
pub mod subscription;

pub use api::ApiRef;
pub use application::{ApplicationRecord, ApplicationSpec, DEFAULT_APP_PREFIX};
pub use plan::PlanRef;
pub use state::PipelineState;
pub use subscription::{ApiKey, SubscriptionRecord};
