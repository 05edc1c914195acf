/// The coordinator's single-threaded event loop.
///
/// One listener plus one session per fragment, all owned by the loop. The
/// only blocking point is `Poller::wait`; accepts, fragment writes and
/// result reads are all non-blocking and resume on the next readiness.
use std::collections::VecDeque;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::os::fd::AsRawFd;

use tracing::{debug, info, warn};

use super::output::{OutputStats, write_output};
use super::poller::{Event, Interest, PollPoller, Poller, Token};
use super::session::{DispatchStatus, Session, SessionReport};
use crate::common::io::FileData;
use crate::error::{Error, Result};
use crate::store::MergeStore;

/// Default size of the per-read scratch buffer.
pub const DEFAULT_READ_CHUNK: usize = 64 * 1024;

/// Listener token; sessions use their fragment ordinal.
const LISTENER: Token = Token(usize::MAX);

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub read_chunk_size: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            read_chunk_size: DEFAULT_READ_CHUNK,
        }
    }
}

/// One partition of the original file, already in indexed-line format.
#[derive(Debug)]
pub struct Fragment {
    pub name: String,
    pub data: FileData,
}

impl Fragment {
    pub fn new(name: impl Into<String>, data: FileData) -> Self {
        Fragment {
            name: name.into(),
            data,
        }
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Fragment::new(name, FileData::Owned(bytes.into()))
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub fragments: usize,
    pub sessions: Vec<SessionReport>,
    /// Connections turned away because every fragment was already assigned.
    pub rejected_connections: u64,
    pub output: OutputStats,
}

pub struct Coordinator<P: Poller = PollPoller> {
    listener: TcpListener,
    poller: P,
    pending: VecDeque<Fragment>,
    /// Indexed by token; a slot is filled once and emptied when its session completes.
    sessions: Vec<Option<Session>>,
    store: MergeStore,
    total: usize,
    completed: usize,
    rejected: u64,
    reports: Vec<SessionReport>,
    config: CoordinatorConfig,
}

impl Coordinator<PollPoller> {
    pub fn new(
        listener: TcpListener,
        fragments: Vec<Fragment>,
        config: CoordinatorConfig,
    ) -> Result<Self> {
        let poller = PollPoller::with_capacity(fragments.len() + 1);
        Coordinator::with_poller(listener, fragments, config, poller)
    }
}

impl<P: Poller> Coordinator<P> {
    /// Take ownership of an already-listening socket and the fragment sources.
    pub fn with_poller(
        listener: TcpListener,
        fragments: Vec<Fragment>,
        config: CoordinatorConfig,
        mut poller: P,
    ) -> Result<Self> {
        listener
            .set_nonblocking(true)
            .map_err(|e| Error::transport("set listener non-blocking", e))?;
        poller
            .register(listener.as_raw_fd(), LISTENER, Interest::READABLE)
            .map_err(Error::Registration)?;

        let total = fragments.len();
        Ok(Coordinator {
            listener,
            poller,
            pending: fragments.into(),
            sessions: Vec::with_capacity(total),
            store: MergeStore::new(),
            total,
            completed: 0,
            rejected: 0,
            reports: Vec::with_capacity(total),
            config,
        })
    }

    /// Number of fragments, which is also the number of sessions the run waits for.
    pub fn fragment_count(&self) -> usize {
        self.total
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Drive the loop until every session is complete, then drain the store
    /// into `dest`.
    pub fn run(mut self, dest: &mut impl Write) -> Result<RunSummary> {
        self.collect()?;
        let output = write_output(&mut self.store, dest).map_err(Error::Destination)?;
        info!(
            records = output.records,
            bytes = output.bytes,
            "output written"
        );
        Ok(RunSummary {
            fragments: self.total,
            sessions: std::mem::take(&mut self.reports),
            rejected_connections: self.rejected,
            output,
        })
    }

    /// The event loop proper: returns once the completed-session count
    /// reaches the fragment count.
    pub fn collect(&mut self) -> Result<()> {
        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, fragments = self.total, "waiting for workers");
        }

        let mut events = Vec::with_capacity(self.total + 1);
        let mut scratch = vec![0u8; self.config.read_chunk_size.max(1)];

        while self.completed < self.total {
            self.poller
                .wait(&mut events)
                .map_err(|e| Error::transport("poll", e))?;

            for event in events.drain(..) {
                if event.token == LISTENER {
                    self.accept_ready()?;
                } else {
                    self.session_ready(event, &mut scratch)?;
                }
            }
        }

        info!(
            sessions = self.completed,
            records = self.store.len(),
            "all sessions complete"
        );
        Ok(())
    }

    fn accept_ready(&mut self) -> Result<()> {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => match self.pending.pop_front() {
                    Some(fragment) => self.open_session(stream, peer, fragment)?,
                    None => self.reject(stream, peer),
                },
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::ConnectionAborted => {
                    debug!("connection aborted before accept");
                    continue;
                }
                Err(e) => return Err(Error::transport("accept", e)),
            }
        }
    }

    fn reject(&mut self, stream: TcpStream, peer: SocketAddr) {
        warn!(%peer, "no fragments left to assign, closing connection");
        self.rejected += 1;
        drop(stream);
    }

    fn open_session(&mut self, stream: TcpStream, peer: SocketAddr, fragment: Fragment) -> Result<()> {
        stream
            .set_nonblocking(true)
            .map_err(|e| Error::transport("set session non-blocking", e))?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(%peer, error = %e, "cannot disable Nagle on session socket");
        }

        let token = Token(self.sessions.len());
        self.poller
            .register(stream.as_raw_fd(), token, Interest::READ_WRITE)
            .map_err(Error::Registration)?;

        info!(
            %peer,
            fragment = %fragment.name,
            bytes = fragment.data.len(),
            "worker connected"
        );
        let mut session = Session::new(stream, peer, token, fragment.name, fragment.data);
        if session.pump_dispatch()? == DispatchStatus::Complete {
            self.poller
                .reregister(token, Interest::READABLE)
                .map_err(Error::Registration)?;
        }
        self.sessions.push(Some(session));
        Ok(())
    }

    fn session_ready(&mut self, event: Event, scratch: &mut [u8]) -> Result<()> {
        let slot = event.token.0;
        let Some(session) = self.sessions.get_mut(slot).and_then(Option::as_mut) else {
            // Already closed earlier in this batch
            return Ok(());
        };

        if (event.writable || event.error) && session.is_dispatching() {
            if session.pump_dispatch()? == DispatchStatus::Complete {
                self.poller
                    .reregister(event.token, Interest::READABLE)
                    .map_err(Error::Registration)?;
            }
        }

        if event.readable || event.hangup || event.error {
            session.receive(scratch, &mut self.store)?;
        }
        if event.hangup {
            session.mark_half_closed();
        }

        if session.is_complete() {
            self.close_session(slot)?;
        }
        Ok(())
    }

    fn close_session(&mut self, slot: usize) -> Result<()> {
        let Some(session) = self.sessions.get_mut(slot).and_then(Option::take) else {
            return Ok(());
        };
        self.poller
            .deregister(session.token())
            .map_err(Error::Registration)?;

        let report = session.report();
        info!(
            peer = %report.peer,
            fragment = %report.fragment,
            accepted = report.records.accepted,
            discarded = report.records.discarded(),
            "session complete"
        );
        self.reports.push(report);
        self.completed += 1;
        // Dropping the session closes its socket
        drop(session);
        Ok(())
    }
}
