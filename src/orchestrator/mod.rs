//! Query lifecycle orchestration.
//!
//! The controller owns submit / poll / fetch; assembly turns fetched payloads
//! into result sets. [`connect`] wires both to the Athena client from a
//! configuration.

mod assembly;
mod controller;
mod lifecycle;

pub use assembly::HeaderPolicy;
pub use controller::{ControllerSettings, LifecycleController};
pub use lifecycle::LifecycleState;

use crate::config::Config;
use crate::engine::athena::AthenaClient;
use crate::error::{QueryError, Result};
use crate::session::SessionSpec;
use std::sync::Arc;

/// Build a controller backed by Athena. An absent configuration is an error.
pub async fn connect(config: Option<&Config>) -> Result<LifecycleController> {
    let config = config.ok_or_else(|| QueryError::config("no configuration supplied"))?;
    config.validate()?;
    let session = SessionSpec::from_config(config)?;
    let sdk_config = session.load().await;
    Ok(LifecycleController::new(
        Arc::new(AthenaClient::new(&sdk_config)),
        ControllerSettings::from(config),
    ))
}
