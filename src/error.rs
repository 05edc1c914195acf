use std::io;

use thiserror::Error;

/// Exit status for a bad command line, descriptor, or missing file.
pub const EXIT_CONFIG: i32 = 1;
/// Exit status for a socket or poller failure.
pub const EXIT_TRANSPORT: i32 = 3;
/// Exit status for a peer that hung up before its EOF record.
pub const EXIT_PROTOCOL: i32 = 4;
/// Exit status for a failed write to the destination.
pub const EXIT_DESTINATION: i32 = 5;
/// Exit status for `--verify` finding a mismatch.
pub const EXIT_MISMATCH: i32 = 6;

/// Fatal run errors. Anything recoverable (bad record, duplicate index)
/// is logged and dropped where it happens and never becomes an `Error`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{context}: {source}")]
    Transport {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("cannot register descriptor with poller: {0}")]
    Registration(#[source] io::Error),

    #[error("peer {peer} closed the connection before sending EOF")]
    ProtocolViolation { peer: String },

    #[error("write to destination failed: {0}")]
    Destination(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn transport(context: &'static str, source: io::Error) -> Self {
        Error::Transport { context, source }
    }

    pub fn protocol(peer: impl Into<String>) -> Self {
        Error::ProtocolViolation { peer: peer.into() }
    }

    /// Process exit status the binaries report for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Transport { .. } | Error::Registration(_) => EXIT_TRANSPORT,
            Error::ProtocolViolation { .. } => EXIT_PROTOCOL,
            Error::Destination(_) => EXIT_DESTINATION,
        }
    }
}
