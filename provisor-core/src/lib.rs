//! Provisor Core
//!
//! Core types shared by the Provisor client, runner and CLI.
//!
//! This crate contains:
//! - Domain types: records the provisioning pipeline produces and consumes
//! - DTOs: request/response bodies of the management API, in both API shapes
//! - `ApiVersion`: which shape of the management API a run talks to

pub mod domain;
pub mod dto;
pub mod version;

pub use version::ApiVersion;
