//! Error type for the CLI runtime.

use std::io;
use std::sync::Arc;

use drpc_client::DrpcError;
use drpc_config::SocketPathError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("invalid socket path: {0}")]
    InvalidSocketPath(#[from] SocketPathError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("call body is not valid base64: {0}")]
    DecodeBody(base64::DecodeError),
    #[error(transparent)]
    Call(#[from] DrpcError),
    #[error("failed to serialise response: {0}")]
    SerialiseResponse(serde_json::Error),
    #[error("failed to write response: {0}")]
    WriteResponse(io::Error),
}
