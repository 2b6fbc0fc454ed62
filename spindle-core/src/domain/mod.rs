//! Core domain types
//!
//! These types are shared between the persistence layer (which stores job
//! specifications), the domain modules (which build services from them) and
//! the spawner (which owns the running services).

pub mod job;
pub mod service;
