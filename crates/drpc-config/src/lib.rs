//! Shared configuration for dRPC clients.
//!
//! Configuration is layered by `ortho-config`: command-line flags override
//! `DRPC_*` environment variables, which override values read from a
//! configuration file, which override the built-in defaults in
//! [`defaults`]. The CLI and any embedding process resolve the same
//! [`Config`] so they agree on the socket location and connect timeout.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;
mod socket;

pub use defaults::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_LOG_FILTER, default_connect_timeout_ms,
    default_log_filter, default_log_filter_string, default_log_format, default_socket_path,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{MAX_SOCKET_PATH_LEN, SocketPathError, validate_socket_path};

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "DRPC")]
pub struct Config {
    /// Filesystem path of the server's sequenced-packet socket.
    #[ortho_config(default = default_socket_path())]
    pub socket_path: Utf8PathBuf,
    /// Upper bound on how long a dial may block, in milliseconds.
    #[ortho_config(default = DEFAULT_CONNECT_TIMEOUT_MS)]
    pub connect_timeout_ms: u64,
    /// `tracing` filter expression applied to emitted events.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format used when logs are written.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            connect_timeout_ms: default_connect_timeout_ms(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Path of the server socket.
    #[must_use]
    pub fn socket_path(&self) -> &Utf8Path {
        self.socket_path.as_path()
    }

    /// Dial timeout as a [`Duration`].
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Filter expression for the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format for the telemetry subscriber.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Checks that the configured socket path can be bound by `connect(2)`.
    pub fn validate(&self) -> Result<(), SocketPathError> {
        validate_socket_path(self.socket_path())
    }
}
