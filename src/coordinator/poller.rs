/// Readiness multiplexing behind a small trait, with a `poll(2)` backend.
use std::io;
use std::os::fd::RawFd;

/// Identifies a registered descriptor in the events `wait` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interest {
    pub readable: bool,
    pub writable: bool,
}

impl Interest {
    /// Read-readiness plus peer hang-up.
    pub const READABLE: Interest = Interest {
        readable: true,
        writable: false,
    };
    pub const READ_WRITE: Interest = Interest {
        readable: true,
        writable: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub token: Token,
    pub readable: bool,
    pub writable: bool,
    /// Peer closed its write side (or the whole connection).
    pub hangup: bool,
    pub error: bool,
}

/// Wait for readiness on a set of descriptors.
pub trait Poller {
    fn register(&mut self, fd: RawFd, token: Token, interest: Interest) -> io::Result<()>;

    fn reregister(&mut self, token: Token, interest: Interest) -> io::Result<()>;

    fn deregister(&mut self, token: Token) -> io::Result<()>;

    /// Block until at least one registered descriptor is ready and replace
    /// the contents of `events` with what fired. EINTR is retried here and
    /// never reaches the caller.
    fn wait(&mut self, events: &mut Vec<Event>) -> io::Result<()>;
}

/// Half-close notification. Without it a peer's shutdown(SHUT_WR) shows up
/// only as readability followed by a zero-length read.
#[cfg(any(target_os = "linux", target_os = "android"))]
const POLL_HANGUP: libc::c_short = libc::POLLRDHUP;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const POLL_HANGUP: libc::c_short = 0;

fn poll_events(interest: Interest) -> libc::c_short {
    let mut events = 0;
    if interest.readable {
        events |= libc::POLLIN | POLL_HANGUP;
    }
    if interest.writable {
        events |= libc::POLLOUT;
    }
    events
}

/// `poll(2)` over a flat table. Tables here hold one listener plus one
/// socket per fragment, so the linear scans are not worth indexing.
#[derive(Default)]
pub struct PollPoller {
    fds: Vec<libc::pollfd>,
    tokens: Vec<Token>,
}

impl PollPoller {
    pub fn new() -> Self {
        PollPoller::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        PollPoller {
            fds: Vec::with_capacity(n),
            tokens: Vec::with_capacity(n),
        }
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.fds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fds.is_empty()
    }

    fn slot(&self, token: Token) -> io::Result<usize> {
        self.tokens.iter().position(|&t| t == token).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("token {} is not registered", token.0),
            )
        })
    }
}

impl Poller for PollPoller {
    fn register(&mut self, fd: RawFd, token: Token, interest: Interest) -> io::Result<()> {
        if fd < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "negative file descriptor",
            ));
        }
        if self.tokens.contains(&token) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("token {} is already registered", token.0),
            ));
        }
        self.fds.push(libc::pollfd {
            fd,
            events: poll_events(interest),
            revents: 0,
        });
        self.tokens.push(token);
        Ok(())
    }

    fn reregister(&mut self, token: Token, interest: Interest) -> io::Result<()> {
        let slot = self.slot(token)?;
        self.fds[slot].events = poll_events(interest);
        Ok(())
    }

    fn deregister(&mut self, token: Token) -> io::Result<()> {
        let slot = self.slot(token)?;
        self.fds.swap_remove(slot);
        self.tokens.swap_remove(slot);
        Ok(())
    }

    fn wait(&mut self, events: &mut Vec<Event>) -> io::Result<()> {
        events.clear();
        if self.fds.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "poll with no registered descriptors would block forever",
            ));
        }

        loop {
            // SAFETY: fds is a live, exclusively borrowed array of
            // self.fds.len() initialized pollfd structs for the whole call.
            let ret = unsafe {
                libc::poll(
                    self.fds.as_mut_ptr(),
                    self.fds.len() as libc::nfds_t,
                    -1,
                )
            };
            if ret < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            if ret > 0 {
                break;
            }
        }

        for (pfd, &token) in self.fds.iter().zip(&self.tokens) {
            let r = pfd.revents;
            if r == 0 {
                continue;
            }
            events.push(Event {
                token,
                readable: r & libc::POLLIN != 0,
                writable: r & libc::POLLOUT != 0,
                hangup: r & (libc::POLLHUP | POLL_HANGUP) != 0,
                error: r & (libc::POLLERR | libc::POLLNVAL) != 0,
            });
        }
        Ok(())
    }
}
