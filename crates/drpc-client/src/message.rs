//! Wire messages exchanged with a dRPC server.
//!
//! Calls and responses are protobuf messages, one per datagram. The body of
//! each message is opaque to the transport: it carries a module-specific
//! payload that the server's handler decodes.

use std::fmt;

use prost::Message;

use crate::error::DrpcError;

/// Largest datagram, in bytes, that either side may send.
pub const MAX_MESSAGE_SIZE: usize = 1 << 17;

/// Request sent to the server.
#[derive(Clone, PartialEq, Eq, Message)]
pub struct Call {
    /// Server module that handles the call.
    #[prost(int32, tag = "1")]
    pub module: i32,
    /// Method within the module.
    #[prost(int32, tag = "2")]
    pub method: i32,
    /// Sequence number stamped by the connection when the call is sent.
    #[prost(int64, tag = "3")]
    pub sequence: i64,
    /// Serialised method arguments.
    #[prost(bytes = "vec", tag = "4")]
    pub body: Vec<u8>,
}

impl Call {
    /// Builds a call for `module`/`method` carrying `body`.
    ///
    /// The sequence number is left at zero; the connection assigns it.
    #[must_use]
    pub const fn new(module: i32, method: i32, body: Vec<u8>) -> Self {
        Self {
            module,
            method,
            sequence: 0,
            body,
        }
    }

    /// Encodes the call as a single datagram.
    pub(crate) fn to_datagram(&self) -> Result<Vec<u8>, DrpcError> {
        let size = self.encoded_len();
        if size > MAX_MESSAGE_SIZE {
            return Err(DrpcError::MessageTooLarge {
                size,
                limit: MAX_MESSAGE_SIZE,
            });
        }
        let mut buffer = Vec::with_capacity(size);
        self.encode(&mut buffer)
            .map_err(|source| DrpcError::Marshal { source })?;
        Ok(buffer)
    }
}

/// Reply received from the server.
#[derive(Clone, PartialEq, Eq, Message)]
pub struct Response {
    /// Sequence number of the call this answers.
    #[prost(int64, tag = "1")]
    pub sequence: i64,
    /// Raw [`Status`] code; see [`Response::status`].
    #[prost(int32, tag = "2")]
    pub status: i32,
    /// Serialised method result.
    #[prost(bytes = "vec", tag = "3")]
    pub body: Vec<u8>,
}

impl Response {
    /// Builds a response to the call with `sequence`.
    #[must_use]
    pub const fn new(sequence: i64, status: Status, body: Vec<u8>) -> Self {
        Self {
            sequence,
            status: status as i32,
            body,
        }
    }

    /// Decoded status code.
    ///
    /// Codes this client does not know are reported as [`Status::Failure`].
    #[must_use]
    pub fn status(&self) -> Status {
        Status::try_from(self.status).unwrap_or(Status::Failure)
    }

    /// Decodes a response from a received datagram.
    pub(crate) fn from_datagram(datagram: &[u8]) -> Result<Self, DrpcError> {
        Self::decode(datagram).map_err(|source| DrpcError::Unmarshal { source })
    }
}

/// Outcome reported by the server for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum Status {
    /// The call completed.
    #[default]
    Success = 0,
    /// The call was accepted and will complete asynchronously.
    Submitted = 1,
    /// The handler failed.
    Failure = 2,
    /// No handler is registered for the module.
    UnknownModule = 3,
    /// The module has no such method.
    UnknownMethod = 4,
    /// The server could not decode the call.
    FailedUnmarshalCall = 5,
    /// The server could not decode the call body.
    FailedUnmarshalPayload = 6,
    /// The server could not encode its response.
    FailedMarshal = 7,
}

impl Status {
    /// Returns `true` for statuses that indicate the call was handled.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::Submitted)
    }

    /// Stable snake-case name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Submitted => "submitted",
            Self::Failure => "failure",
            Self::UnknownModule => "unknown_module",
            Self::UnknownMethod => "unknown_method",
            Self::FailedUnmarshalCall => "failed_unmarshal_call",
            Self::FailedUnmarshalPayload => "failed_unmarshal_payload",
            Self::FailedMarshal => "failed_marshal",
        }
    }
}

impl TryFrom<i32> for Status {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Success),
            1 => Ok(Self::Submitted),
            2 => Ok(Self::Failure),
            3 => Ok(Self::UnknownModule),
            4 => Ok(Self::UnknownMethod),
            5 => Ok(Self::FailedUnmarshalCall),
            6 => Ok(Self::FailedUnmarshalPayload),
            7 => Ok(Self::FailedMarshal),
            other => Err(other),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
