//! Client transport for dRPC, a request/response protocol carried over a
//! Unix sequenced-packet socket.
//!
//! [`ClientConnection`] owns the socket and its connected/disconnected state,
//! stamps each outgoing [`Call`] with a sequence number, and turns a fired
//! [`CallContext`] into a forced teardown of any blocked write or read.
//!
//! ```no_run
//! use drpc_client::{Call, CallContext, ClientConnection};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), drpc_client::DrpcError> {
//! let connection = ClientConnection::new("/run/drpc/drpc.sock");
//! connection.connect()?;
//!
//! let guard = connection.lock();
//! let context = CallContext::with_timeout(Duration::from_secs(2));
//! let response = connection.send_msg(&context, Call::new(2, 7, Vec::new()))?;
//! guard.unlock();
//!
//! println!("status: {}", response.status());
//! connection.close()?;
//! # Ok(())
//! # }
//! ```

#[cfg(not(unix))]
compile_error!("drpc-client requires Unix domain socket support");

mod connection;
mod context;
mod dialer;
mod error;
mod message;
mod watch;

pub use connection::{CallGuard, ClientConnection, DomainSocketClient};
pub use context::CallContext;
pub use dialer::{
    DEFAULT_CONNECT_TIMEOUT, Dialer, MessageChannel, SeqPacketChannel, SeqPacketDialer,
};
pub use error::{DrpcError, ErrorKind};
pub use message::{Call, MAX_MESSAGE_SIZE, Response, Status};

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::connection");

#[cfg(test)]
mod tests;
