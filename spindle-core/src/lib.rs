//! Spindle Core
//!
//! Core types and abstractions shared by the spawner and the domain modules.
//!
//! This crate contains:
//! - Domain types: job identifiers, job specifications, job services
//! - Factory registry: maps a job type tag to the factory that expands a
//!   specification into its running services

pub mod domain;
pub mod factory;

pub use domain::job::{JobDefinition, JobErrorRecord, JobId, JobSpec};
pub use domain::service::JobService;
pub use factory::{FactoryRegistry, JobServiceFactory};
