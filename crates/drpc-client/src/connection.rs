//! Connection state machine for a dRPC client.
//!
//! A [`ClientConnection`] is either disconnected (no channel) or connected
//! (exactly one channel). Connecting resets the call sequence; every call
//! sent afterwards is stamped with the next sequence number. Blocking writes
//! and reads run under a [`CancelWatch`] so a fired [`CallContext`] forces the
//! connection closed and the stuck call fails.
//!
//! The protocol allows one call in flight per connection. Callers sharing a
//! connection must hold the guard returned by [`ClientConnection::lock`] for
//! the whole exchange.

use std::io;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use camino::{Utf8Path, Utf8PathBuf};
use drpc_config::Config;
use tracing::{debug, warn};

use crate::context::CallContext;
use crate::dialer::{Dialer, MessageChannel, SeqPacketDialer};
use crate::error::{DrpcError, cancelled_io_error};
use crate::message::{Call, MAX_MESSAGE_SIZE, Response};
use crate::watch::CancelWatch;
use crate::CLIENT_TARGET;

/// Capability exposed by a dRPC client connection.
///
/// Implemented by [`ClientConnection`]; code that only issues calls can
/// depend on this trait and be handed a test double instead.
pub trait DomainSocketClient: Send + Sync {
    /// Acquires the exclusive-call lock; see [`ClientConnection::lock`].
    fn lock(&self) -> CallGuard<'_>;

    /// Returns `true` while a channel is open.
    fn is_connected(&self) -> bool;

    /// Opens the channel if it is not already open.
    fn connect(&self) -> Result<(), DrpcError>;

    /// Closes the channel if it is open.
    fn close(&self) -> Result<(), DrpcError>;

    /// Sends `call` and waits for its response.
    fn send_msg(&self, context: &CallContext, call: Option<Call>) -> Result<Response, DrpcError>;

    /// Socket path supplied at construction.
    fn socket_path(&self) -> &Utf8Path;
}

/// Guard for the exclusive-call lock.
///
/// Dropping the guard, or calling [`CallGuard::unlock`], releases the lock.
#[must_use = "the exclusive-call lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct CallGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl CallGuard<'_> {
    /// Releases the exclusive-call lock.
    pub fn unlock(self) {
        drop(self);
    }
}

/// Channel and sequence counter, guarded together by the presence lock.
#[derive(Debug, Default)]
struct Presence {
    channel: Option<Arc<dyn MessageChannel>>,
    sequence: i64,
}

/// Client side of a dRPC connection over a Unix domain socket.
pub struct ClientConnection {
    socket_path: Utf8PathBuf,
    dialer: Arc<dyn Dialer>,
    presence: Arc<RwLock<Presence>>,
    call_lock: Mutex<()>,
}

impl ClientConnection {
    /// Disconnected client for `socket_path` using the [`SeqPacketDialer`].
    #[must_use]
    pub fn new(socket_path: impl Into<Utf8PathBuf>) -> Self {
        Self::with_dialer(socket_path, Arc::new(SeqPacketDialer::default()))
    }

    /// Disconnected client for `socket_path` that connects through `dialer`.
    #[must_use]
    pub fn with_dialer(socket_path: impl Into<Utf8PathBuf>, dialer: Arc<dyn Dialer>) -> Self {
        Self {
            socket_path: socket_path.into(),
            dialer,
            presence: Arc::new(RwLock::new(Presence::default())),
            call_lock: Mutex::new(()),
        }
    }

    /// Disconnected client for the socket path and connect timeout in `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::with_dialer(
            config.socket_path(),
            Arc::new(SeqPacketDialer::new(config.connect_timeout())),
        )
    }

    /// Acquires the exclusive-call lock.
    ///
    /// The connection carries one call at a time. When several threads share
    /// a connection each must hold this guard from before
    /// [`send_msg`](Self::send_msg) until its response has been consumed.
    /// The lock is independent of the internal state lock, so
    /// [`is_connected`](Self::is_connected) never waits on it.
    pub fn lock(&self) -> CallGuard<'_> {
        CallGuard {
            _guard: self
                .call_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Returns `true` while a channel is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        read_presence(&self.presence).channel.is_some()
    }

    /// Opens the channel.
    ///
    /// Does nothing when already connected; the existing channel is not
    /// probed for liveness. Otherwise dials the socket and, on success,
    /// resets the sequence counter so the next call is stamped `1`.
    ///
    /// The dial runs without the state lock held. If another caller
    /// connected in the meantime, its channel is kept and the one dialled
    /// here is closed.
    pub fn connect(&self) -> Result<(), DrpcError> {
        if self.is_connected() {
            return Ok(());
        }

        let channel: Arc<dyn MessageChannel> = self
            .dialer
            .dial(&self.socket_path)
            .map_err(|source| DrpcError::Connect {
                path: self.socket_path.clone(),
                source,
            })?
            .into();

        let mut presence = write_presence(&self.presence);
        if presence.channel.is_some() {
            drop(presence);
            if let Err(error) = channel.close() {
                warn!(
                    target: CLIENT_TARGET,
                    path = %self.socket_path,
                    error = %error,
                    "failed to close surplus dRPC channel"
                );
            }
            return Ok(());
        }

        presence.channel = Some(channel);
        presence.sequence = 0;
        debug!(target: CLIENT_TARGET, path = %self.socket_path, "dRPC connected");
        Ok(())
    }

    /// Closes the channel.
    ///
    /// Does nothing when already disconnected. Otherwise the connection is
    /// disconnected when this returns even if the channel reported an error
    /// while closing; that error is still returned.
    pub fn close(&self) -> Result<(), DrpcError> {
        close_presence(&self.presence)
    }

    /// Sends `call` and waits for its response.
    ///
    /// The call is stamped with the next sequence number before it is
    /// encoded; a failed call still consumes its number. `context` bounds the
    /// write and the read: if it fires while either is blocked the connection
    /// is closed and the call fails. Nothing is retried and a failed call
    /// leaves reconnecting to the caller.
    pub fn send_msg(
        &self,
        context: &CallContext,
        call: impl Into<Option<Call>>,
    ) -> Result<Response, DrpcError> {
        if !self.is_connected() {
            return Err(DrpcError::NotConnected);
        }
        let call = call.into().ok_or(DrpcError::MissingCall)?;

        let channel = self.send_call(context, call)?;
        self.recv_response(context, channel.as_ref())
    }

    /// Socket path supplied at construction.
    #[must_use]
    pub fn socket_path(&self) -> &Utf8Path {
        &self.socket_path
    }

    fn send_call(
        &self,
        context: &CallContext,
        mut call: Call,
    ) -> Result<Arc<dyn MessageChannel>, DrpcError> {
        let channel = {
            let mut presence = write_presence(&self.presence);
            let channel = presence.channel.clone().ok_or(DrpcError::NotConnected)?;
            presence.sequence += 1;
            call.sequence = presence.sequence;
            channel
        };

        let datagram = call.to_datagram()?;

        let watch = self.arm_watch(context).map_err(|source| DrpcError::Send { source })?;
        let written = channel.send(&datagram);
        let cancelled = watch.finish();
        if cancelled {
            return Err(DrpcError::Send {
                source: cancelled_io_error(),
            });
        }
        match written {
            Ok(len) if len == datagram.len() => {}
            Ok(len) => {
                return Err(DrpcError::Send {
                    source: io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("short write: {len} of {} bytes", datagram.len()),
                    ),
                });
            }
            Err(source) => return Err(DrpcError::Send { source }),
        }

        debug!(
            target: CLIENT_TARGET,
            sequence = call.sequence,
            module = call.module,
            method = call.method,
            "dRPC call sent"
        );
        Ok(channel)
    }

    fn recv_response(
        &self,
        context: &CallContext,
        channel: &dyn MessageChannel,
    ) -> Result<Response, DrpcError> {
        let mut buffer = vec![0_u8; MAX_MESSAGE_SIZE];

        let watch = self
            .arm_watch(context)
            .map_err(|source| DrpcError::Receive { source })?;
        let read = channel.recv(&mut buffer);
        let cancelled = watch.finish();
        if cancelled {
            return Err(DrpcError::Receive {
                source: cancelled_io_error(),
            });
        }

        let len = match read {
            Ok(0) => {
                return Err(DrpcError::Receive {
                    source: io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed before a response arrived",
                    ),
                });
            }
            Ok(len) => len,
            Err(source) => return Err(DrpcError::Receive { source }),
        };
        buffer.truncate(len);

        let response = Response::from_datagram(&buffer)?;
        debug!(
            target: CLIENT_TARGET,
            sequence = response.sequence,
            status = %response.status(),
            "dRPC response received"
        );
        Ok(response)
    }

    fn arm_watch(&self, context: &CallContext) -> io::Result<CancelWatch> {
        let presence = Arc::clone(&self.presence);
        let path = self.socket_path.clone();
        CancelWatch::arm(context, move || {
            debug!(target: CLIENT_TARGET, path = %path, "dRPC call cancelled; closing connection");
            if let Err(error) = close_presence(&presence) {
                warn!(
                    target: CLIENT_TARGET,
                    path = %path,
                    error = %error,
                    "failed to close cancelled dRPC connection"
                );
            }
        })
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ClientConnection")
            .field("socket_path", &self.socket_path)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl DomainSocketClient for ClientConnection {
    fn lock(&self) -> CallGuard<'_> {
        Self::lock(self)
    }

    fn is_connected(&self) -> bool {
        Self::is_connected(self)
    }

    fn connect(&self) -> Result<(), DrpcError> {
        Self::connect(self)
    }

    fn close(&self) -> Result<(), DrpcError> {
        Self::close(self)
    }

    fn send_msg(&self, context: &CallContext, call: Option<Call>) -> Result<Response, DrpcError> {
        Self::send_msg(self, context, call)
    }

    fn socket_path(&self) -> &Utf8Path {
        Self::socket_path(self)
    }
}

/// Clears the channel, closing it first. Shared by `close` and the
/// cancellation watcher.
fn close_presence(presence: &RwLock<Presence>) -> Result<(), DrpcError> {
    let mut presence = write_presence(presence);
    let Some(channel) = presence.channel.take() else {
        return Ok(());
    };
    debug!(target: CLIENT_TARGET, "dRPC connection closed");
    channel.close().map_err(|source| DrpcError::Close { source })
}

// Presence is only ever mutated as a whole under the write lock, so a
// poisoned lock still guards consistent state.
fn read_presence(presence: &RwLock<Presence>) -> RwLockReadGuard<'_, Presence> {
    presence.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_presence(presence: &RwLock<Presence>) -> RwLockWriteGuard<'_, Presence> {
    presence.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
impl ClientConnection {
    /// Current value of the sequence counter.
    pub(crate) fn sequence(&self) -> i64 {
        read_presence(&self.presence).sequence
    }
}
