//! Scheduler layer for the runner
//!
//! This layer dispatches provisioning units over a bounded worker pool and
//! collects their outcomes. It owns no remote state of its own.

pub mod driver;

pub use driver::{BatchDriver, BatchReport, DriverError, Progress};
