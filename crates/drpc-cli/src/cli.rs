//! Argument definitions for the `drpc` binary.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use clap::Parser;
use drpc_client::{Call, CallContext};

use crate::AppError;

/// Issues one dRPC call over a Unix sequenced-packet socket.
///
/// Configuration flags such as `--socket-path` must precede `MODULE`.
#[derive(Parser, Debug)]
#[command(name = "drpc", version)]
pub(crate) struct Cli {
    /// Numeric identifier of the server module.
    #[arg(value_name = "MODULE")]
    pub(crate) module: i32,
    /// Numeric identifier of the method within the module.
    #[arg(value_name = "METHOD")]
    pub(crate) method: i32,
    /// Call payload, base64 encoded. Defaults to an empty body.
    #[arg(long, value_name = "BASE64")]
    pub(crate) body: Option<String>,
    /// Abandons the call, and the connection, after this many milliseconds.
    #[arg(long = "timeout-ms", value_name = "MS")]
    pub(crate) timeout_ms: Option<u64>,
}

impl Cli {
    /// Builds the call described by the arguments.
    pub(crate) fn call(&self) -> Result<Call, AppError> {
        let body = match self.body.as_deref() {
            Some(encoded) => STANDARD.decode(encoded).map_err(AppError::DecodeBody)?,
            None => Vec::new(),
        };
        Ok(Call::new(self.module, self.method, body))
    }

    /// Context bounding the call; unbounded unless `--timeout-ms` was given.
    pub(crate) fn context(&self) -> CallContext {
        self.timeout_ms.map_or_else(CallContext::new, |millis| {
            CallContext::with_timeout(Duration::from_millis(millis))
        })
    }
}
