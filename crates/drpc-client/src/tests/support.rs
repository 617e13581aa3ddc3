//! Test doubles for the dialer and channel capabilities.
//!
//! [`PairedDialer`] hands the connection one end of an in-memory
//! sequenced-packet pair and keeps the other end so a test can play the
//! server. The mockall doubles cover failure paths a real socket cannot
//! produce on demand.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;
use std::thread::{self, JoinHandle};

use camino::Utf8Path;
use mockall::mock;
use prost::Message;

use crate::{Call, Dialer, MessageChannel, Response, SeqPacketChannel, Status};

mock! {
    pub(crate) Channel {}
    impl MessageChannel for Channel {
        fn send(&self, message: &[u8]) -> io::Result<usize>;
        fn recv(&self, buffer: &mut [u8]) -> io::Result<usize>;
        fn close(&self) -> io::Result<()>;
    }
}

impl fmt::Debug for MockChannel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("MockChannel")
    }
}

mock! {
    pub(crate) SocketDialer {}
    impl Dialer for SocketDialer {
        fn dial(&self, socket_path: &Utf8Path) -> io::Result<Box<dyn MessageChannel>>;
    }
}

/// Builds a dialer that hands out `channel` on its only dial.
pub(crate) fn dialer_for(channel: MockChannel) -> Arc<MockSocketDialer> {
    let mut dialer = MockSocketDialer::new();
    dialer
        .expect_dial()
        .return_once(move |_| Ok(Box::new(channel) as Box<dyn MessageChannel>));
    Arc::new(dialer)
}

/// Dialer backed by in-memory socket pairs.
#[derive(Default)]
pub(crate) struct PairedDialer {
    peers: Mutex<Vec<SeqPacketChannel>>,
    dials: AtomicUsize,
}

impl PairedDialer {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of successful dials so far.
    pub(crate) fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    /// Removes and returns the server end of the most recent dial.
    pub(crate) fn take_peer(&self) -> SeqPacketChannel {
        self.peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .expect("no peer available; was connect called?")
    }
}

impl Dialer for PairedDialer {
    fn dial(&self, _socket_path: &Utf8Path) -> io::Result<Box<dyn MessageChannel>> {
        let (client, server) = SeqPacketChannel::pair()?;
        self.peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(server);
        self.dials.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(client))
    }
}

/// Dialer that stalls for `delay` before handing out a socket pair.
pub(crate) struct SlowDialer {
    delay: Duration,
    inner: Arc<PairedDialer>,
}

impl SlowDialer {
    pub(crate) fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            inner: PairedDialer::new(),
        })
    }

    pub(crate) fn dials(&self) -> usize {
        self.inner.dials()
    }
}

impl Dialer for SlowDialer {
    fn dial(&self, socket_path: &Utf8Path) -> io::Result<Box<dyn MessageChannel>> {
        thread::sleep(self.delay);
        self.inner.dial(socket_path)
    }
}

/// Channel whose writes block until the channel is closed.
#[derive(Debug, Default)]
pub(crate) struct StalledChannel {
    closed: Mutex<bool>,
    signal: Condvar,
}

impl MessageChannel for StalledChannel {
    fn send(&self, _message: &[u8]) -> io::Result<usize> {
        let mut closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
        while !*closed {
            closed = self
                .signal
                .wait(closed)
                .unwrap_or_else(PoisonError::into_inner);
        }
        Err(io::Error::from(io::ErrorKind::BrokenPipe))
    }

    fn recv(&self, _buffer: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }

    fn close(&self) -> io::Result<()> {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.signal.notify_all();
        Ok(())
    }
}

/// Reads one call from `peer`.
pub(crate) fn read_call(peer: &SeqPacketChannel) -> Call {
    let mut buffer = vec![0_u8; crate::MAX_MESSAGE_SIZE];
    let len = peer.recv(&mut buffer).expect("read call");
    buffer.truncate(len);
    Call::decode(buffer.as_slice()).expect("decode call")
}

/// Writes `response` to `peer` as one datagram.
pub(crate) fn write_response(peer: &SeqPacketChannel, response: &Response) {
    let datagram = response.encode_to_vec();
    peer.send(&datagram).expect("write response");
}

/// Plays the server for `calls` exchanges, echoing each call body back with
/// a success status, and returns the calls it saw.
pub(crate) fn spawn_echo_server(peer: SeqPacketChannel, calls: usize) -> JoinHandle<Vec<Call>> {
    thread::spawn(move || {
        (0..calls)
            .map(|_| {
                let call = read_call(&peer);
                let response = Response::new(call.sequence, Status::Success, call.body.clone());
                write_response(&peer, &response);
                call
            })
            .collect()
    })
}
