//! Error types surfaced at the CLI boundary.

use std::io;
use std::sync::Arc;

use corsica_runtime::{LifecycleError, PluginError, ProvisionError};
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    #[error("failed to write command output: {0}")]
    Output(#[source] io::Error),
}
