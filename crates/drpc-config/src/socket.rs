//! Validation of Unix socket paths before they reach `connect(2)`.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Longest path accepted in `sockaddr_un.sun_path`, excluding the trailing NUL.
pub const MAX_SOCKET_PATH_LEN: usize = 107;

/// Errors raised when a socket path cannot be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SocketPathError {
    /// No path was configured.
    #[error("socket path must not be empty")]
    Empty,
    /// The path does not fit in `sun_path`.
    #[error(
        "socket path '{path}' is {len} bytes; the limit is {limit}",
        limit = MAX_SOCKET_PATH_LEN
    )]
    TooLong { path: Utf8PathBuf, len: usize },
    /// The path names a directory rather than a socket file.
    #[error("socket path '{path}' has no file name")]
    MissingFileName { path: Utf8PathBuf },
}

/// Checks that `path` can be used as a Unix socket address.
pub fn validate_socket_path(path: &Utf8Path) -> Result<(), SocketPathError> {
    if path.as_str().is_empty() {
        return Err(SocketPathError::Empty);
    }
    let len = path.as_str().len();
    if len > MAX_SOCKET_PATH_LEN {
        return Err(SocketPathError::TooLong {
            path: path.to_path_buf(),
            len,
        });
    }
    if path.file_name().is_none() {
        return Err(SocketPathError::MissingFileName {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}
