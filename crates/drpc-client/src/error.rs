//! Error types surfaced by the dRPC client connection.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Coarse classification of a [`DrpcError`].
///
/// Callers that only need to branch on the failure class (for example to
/// decide whether to reconnect) can match on this instead of the full error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A call was attempted while disconnected.
    NotConnected,
    /// The caller supplied no call message.
    InvalidArgument,
    /// Dialling the socket failed.
    ConnectFailure,
    /// Closing the channel failed. The connection is still disconnected.
    CloseFailure,
    /// The outgoing call could not be serialised. No I/O took place.
    MarshalFailure,
    /// Writing the call failed, possibly because the call was cancelled.
    SendFailure,
    /// Reading the response failed, possibly because the call was cancelled.
    ReceiveFailure,
    /// The response was read but could not be decoded.
    UnmarshalFailure,
}

/// Errors raised by [`ClientConnection`](crate::ClientConnection).
#[derive(Debug, Error)]
pub enum DrpcError {
    /// A call was attempted while disconnected.
    #[error("dRPC not connected")]
    NotConnected,
    /// No call message was supplied.
    #[error("invalid dRPC call: no message supplied")]
    MissingCall,
    /// The dialer failed to open the socket.
    #[error("dRPC connect to {path} failed: {source}")]
    Connect {
        /// Socket path that was dialled.
        path: Utf8PathBuf,
        /// Underlying dial failure.
        #[source]
        source: io::Error,
    },
    /// The channel reported an error while closing.
    #[error("dRPC close failed: {source}")]
    Close {
        /// Underlying close failure.
        #[source]
        source: io::Error,
    },
    /// The encoded call does not fit in a single datagram.
    #[error("failed to marshal dRPC request: {size} bytes exceeds the {limit} byte limit")]
    MessageTooLarge {
        /// Encoded size of the call.
        size: usize,
        /// Largest message the transport carries.
        limit: usize,
    },
    /// The call could not be encoded.
    #[error("failed to marshal dRPC request: {source}")]
    Marshal {
        /// Underlying encoder failure.
        #[source]
        source: prost::EncodeError,
    },
    /// Writing the call to the channel failed.
    #[error("dRPC send failed: {source}")]
    Send {
        /// Underlying write failure.
        #[source]
        source: io::Error,
    },
    /// Reading the response from the channel failed.
    #[error("dRPC recv failed: {source}")]
    Receive {
        /// Underlying read failure.
        #[source]
        source: io::Error,
    },
    /// The response bytes did not decode.
    #[error("failed to unmarshal dRPC response: {source}")]
    Unmarshal {
        /// Underlying decoder failure.
        #[source]
        source: prost::DecodeError,
    },
}

impl DrpcError {
    /// Returns the failure class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotConnected => ErrorKind::NotConnected,
            Self::MissingCall => ErrorKind::InvalidArgument,
            Self::Connect { .. } => ErrorKind::ConnectFailure,
            Self::Close { .. } => ErrorKind::CloseFailure,
            Self::MessageTooLarge { .. } | Self::Marshal { .. } => ErrorKind::MarshalFailure,
            Self::Send { .. } => ErrorKind::SendFailure,
            Self::Receive { .. } => ErrorKind::ReceiveFailure,
            Self::Unmarshal { .. } => ErrorKind::UnmarshalFailure,
        }
    }

    /// Returns `true` when the I/O failure was caused by the call context
    /// firing rather than by the peer.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Send { source } | Self::Receive { source } => {
                source.kind() == io::ErrorKind::Interrupted
            }
            _ => false,
        }
    }
}

/// Builds the I/O error reported when the call context fires mid-I/O.
pub(crate) fn cancelled_io_error() -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, "dRPC call cancelled")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::not_connected(DrpcError::NotConnected, ErrorKind::NotConnected)]
    #[case::missing_call(DrpcError::MissingCall, ErrorKind::InvalidArgument)]
    #[case::too_large(
        DrpcError::MessageTooLarge { size: 10, limit: 5 },
        ErrorKind::MarshalFailure
    )]
    #[case::send(
        DrpcError::Send { source: io::Error::from(io::ErrorKind::BrokenPipe) },
        ErrorKind::SendFailure
    )]
    #[case::receive(
        DrpcError::Receive { source: io::Error::from(io::ErrorKind::UnexpectedEof) },
        ErrorKind::ReceiveFailure
    )]
    fn errors_map_to_their_class(#[case] error: DrpcError, #[case] expected: ErrorKind) {
        assert_eq!(error.kind(), expected);
    }

    #[test]
    fn connect_error_message_includes_path() {
        let error = DrpcError::Connect {
            path: Utf8PathBuf::from("/tmp/test.sock"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        let message = error.to_string();
        assert!(
            message.contains("/tmp/test.sock"),
            "expected path in message: {message}"
        );
    }

    #[test]
    fn cancellation_is_detected_on_io_variants_only() {
        let send = DrpcError::Send {
            source: cancelled_io_error(),
        };
        let receive = DrpcError::Receive {
            source: cancelled_io_error(),
        };
        let broken = DrpcError::Send {
            source: io::Error::from(io::ErrorKind::BrokenPipe),
        };
        assert!(send.is_cancelled());
        assert!(receive.is_cancelled());
        assert!(!broken.is_cancelled());
        assert!(!DrpcError::NotConnected.is_cancelled());
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DrpcError>();
    }
}
