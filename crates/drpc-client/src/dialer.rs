//! Socket dialling and the message channel abstraction.
//!
//! The connection state machine only ever sees a [`MessageChannel`]: a
//! connected duplex handle that moves whole datagrams. [`SeqPacketDialer`]
//! produces one from a `SOCK_SEQPACKET` Unix socket; tests swap in their own
//! [`Dialer`] to avoid touching the filesystem.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::time::Duration;

use camino::Utf8Path;
use socket2::{Domain, SockAddr, Socket, Type};

/// Default bound on how long [`SeqPacketDialer`] waits for `connect(2)`.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connected, datagram-preserving duplex channel.
///
/// Methods take `&self` so the connection can tear the channel down from a
/// watcher thread while another thread is blocked in [`send`](Self::send) or
/// [`recv`](Self::recv).
pub trait MessageChannel: Send + Sync + fmt::Debug {
    /// Writes `message` as exactly one datagram, returning the bytes written.
    fn send(&self, message: &[u8]) -> io::Result<usize>;

    /// Reads exactly one datagram into `buffer`, returning its length.
    ///
    /// A return of `Ok(0)` means the peer, or a local [`close`](Self::close),
    /// ended the stream.
    fn recv(&self, buffer: &mut [u8]) -> io::Result<usize>;

    /// Shuts the channel down in both directions, failing pending and future
    /// I/O on every handle to it.
    fn close(&self) -> io::Result<()>;
}

/// Capability that opens a [`MessageChannel`] to a socket path.
pub trait Dialer: Send + Sync {
    /// Connects to the server listening at `socket_path`.
    fn dial(&self, socket_path: &Utf8Path) -> io::Result<Box<dyn MessageChannel>>;
}

/// [`MessageChannel`] over a Unix `SOCK_SEQPACKET` socket.
#[derive(Debug)]
pub struct SeqPacketChannel {
    stream: UnixStream,
}

impl SeqPacketChannel {
    /// Creates two connected channels backed by an anonymous socket pair.
    ///
    /// Useful for running a client against an in-process server.
    pub fn pair() -> io::Result<(Self, Self)> {
        let (left, right) = Socket::pair(Domain::UNIX, Type::SEQPACKET, None)?;
        Ok((Self::from_socket(left), Self::from_socket(right)))
    }

    fn from_socket(socket: Socket) -> Self {
        Self {
            stream: socket.into(),
        }
    }
}

impl MessageChannel for SeqPacketChannel {
    fn send(&self, message: &[u8]) -> io::Result<usize> {
        (&self.stream).write(message)
    }

    fn recv(&self, buffer: &mut [u8]) -> io::Result<usize> {
        (&self.stream).read(buffer)
    }

    fn close(&self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            // The peer already tore the socket down; there is nothing left to close.
            Err(error) if error.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

/// Production [`Dialer`] for `SOCK_SEQPACKET` Unix sockets.
#[derive(Debug, Clone, Copy)]
pub struct SeqPacketDialer {
    connect_timeout: Duration,
}

impl SeqPacketDialer {
    /// Dialer that waits at most `connect_timeout` for each connection.
    #[must_use]
    pub const fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Timeout applied to each dial.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl Default for SeqPacketDialer {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl Dialer for SeqPacketDialer {
    fn dial(&self, socket_path: &Utf8Path) -> io::Result<Box<dyn MessageChannel>> {
        let socket = Socket::new(Domain::UNIX, Type::SEQPACKET, None)?;
        let address = SockAddr::unix(socket_path.as_std_path())?;
        socket.connect_timeout(&address, self.connect_timeout)?;
        // Writes and reads block until they complete or the channel is torn down.
        socket.set_nonblocking(false)?;
        Ok(Box::new(SeqPacketChannel::from_socket(socket)))
    }
}
