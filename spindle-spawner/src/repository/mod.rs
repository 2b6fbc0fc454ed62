//! Repository layer
//!
//! The spawner only needs two things from persistence: enumerate every
//! stored job specification and record an error annotation against one.
//! The trait keeps the spawner independent of the actual storage; the
//! in-memory implementation backs the demo binary and the tests.

mod jobs;

pub use jobs::{InMemoryJobStore, JobStore};
