use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};

use tracing::{debug, warn};

use super::poller::Token;
use crate::common::io::FileData;
use crate::error::{Error, Result};
use crate::protocol::{FramingParser, Intake, IntakeStats, SENTINEL, TERMINATOR, preview};
use crate::store::MergeStore;

/// Sentinel preceded by a terminator, for fragments whose last line lacks one.
const TERMINATED_SENTINEL: &[u8] = b"\nEOF\n";

/// Progress of the coordinator→worker direction.
enum Dispatch {
    Sending {
        data: FileData,
        tail: &'static [u8],
        sent: usize,
    },
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// Socket would block; wait for write-readiness.
    Pending,
    /// Fragment and sentinel fully written.
    Complete,
}

/// What the coordinator knows about a finished session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub peer: SocketAddr,
    pub fragment: String,
    pub bytes_dispatched: u64,
    pub records: IntakeStats,
}

/// One accepted worker connection: streams its fragment out, then frames
/// and files the records it sends back.
pub struct Session {
    stream: TcpStream,
    peer: SocketAddr,
    token: Token,
    fragment: String,
    dispatch: Dispatch,
    dispatched: u64,
    parser: FramingParser,
    intake: Intake,
    peer_half_closed: bool,
}

impl Session {
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        token: Token,
        fragment: String,
        data: FileData,
    ) -> Self {
        let tail = if data.last().is_some_and(|&b| b != TERMINATOR) {
            TERMINATED_SENTINEL
        } else {
            SENTINEL
        };
        Session {
            stream,
            peer,
            token,
            fragment,
            dispatch: Dispatch::Sending {
                data,
                tail,
                sent: 0,
            },
            dispatched: 0,
            parser: FramingParser::new(),
            intake: Intake::new(peer.to_string()),
            peer_half_closed: false,
        }
    }

    #[inline]
    pub fn token(&self) -> Token {
        self.token
    }

    #[inline]
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    #[inline]
    pub fn is_dispatching(&self) -> bool {
        matches!(self.dispatch, Dispatch::Sending { .. })
    }

    #[inline]
    pub fn sentinel_received(&self) -> bool {
        self.intake.sentinel_received()
    }

    #[inline]
    pub fn peer_half_closed(&self) -> bool {
        self.peer_half_closed
    }

    /// Both directions finished: EOF record seen and the peer hung up.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.sentinel_received() && self.peer_half_closed
    }

    pub fn mark_half_closed(&mut self) {
        self.peer_half_closed = true;
    }

    /// Write as much of the fragment (then the sentinel) as the socket takes.
    /// Short writes advance the cursor; EINTR is retried; `WouldBlock`
    /// returns `Pending` with the cursor kept for the next write-readiness.
    pub fn pump_dispatch(&mut self) -> Result<DispatchStatus> {
        let Dispatch::Sending { data, tail, sent } = &mut self.dispatch else {
            return Ok(DispatchStatus::Complete);
        };

        let total = data.len() + tail.len();
        while *sent < total {
            let chunk = if *sent < data.len() {
                &data[*sent..]
            } else {
                &tail[*sent - data.len()..]
            };
            match self.stream.write(chunk) {
                Ok(0) => {
                    return Err(Error::transport(
                        "write fragment",
                        io::Error::new(io::ErrorKind::WriteZero, "socket accepted no data"),
                    ));
                }
                Ok(n) => {
                    *sent += n;
                    self.dispatched += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    debug!(peer = %self.peer, sent = *sent, total, "fragment dispatch paused");
                    return Ok(DispatchStatus::Pending);
                }
                Err(e) => return Err(Error::transport("write fragment", e)),
            }
        }

        debug!(peer = %self.peer, fragment = %self.fragment, bytes = total, "fragment dispatched");
        // Drops the fragment source as soon as it is no longer needed
        self.dispatch = Dispatch::Done;
        Ok(DispatchStatus::Complete)
    }

    /// Read until the socket would block, framing every chunk into `store`.
    /// A zero-length read before the sentinel is a protocol violation; after
    /// it, the read counts as the peer's hang-up.
    pub fn receive(&mut self, scratch: &mut [u8], store: &mut MergeStore) -> Result<()> {
        loop {
            let n = match self.stream.read(scratch) {
                Ok(0) => return self.on_eof(),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(Error::transport("read results", e)),
            };

            let intake = &mut self.intake;
            let framed = self.parser.feed(&scratch[..n], |payload| intake.accept(payload, store));
            debug!(peer = %self.peer, bytes = n, records = framed, "chunk received");
        }
    }

    fn on_eof(&mut self) -> Result<()> {
        if !self.sentinel_received() {
            return Err(Error::protocol(self.peer.to_string()));
        }
        if self.parser.has_pending() {
            warn!(
                peer = %self.peer,
                line = %preview(self.parser.pending()),
                "discarding unterminated data after EOF"
            );
        }
        self.peer_half_closed = true;
        Ok(())
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            peer: self.peer,
            fragment: self.fragment.clone(),
            bytes_dispatched: self.dispatched,
            records: self.intake.stats(),
        }
    }
}
