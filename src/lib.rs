//! Submit-then-poll client for Amazon Athena.
//!
//! [`orchestrator::LifecycleController`] submits SQL, polls the execution at a
//! fixed interval until it reaches a terminal state or the timeout budget runs
//! out, then fetches the rows. The service is reached through the
//! [`engine::ExecutionClient`] trait.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod session;

pub use error::{QueryError, Result};
