/// Worker side of the protocol: receive one fragment, order it by line
/// index with the same framer and merge store the coordinator uses, and
/// stream it back followed by the sentinel.
use std::io::{self, BufWriter, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use tracing::{debug, info, warn};

use crate::common::io::write_full;
use crate::error::{Error, Result};
use crate::protocol::{FramingParser, Intake, IntakeStats, SENTINEL, preview};
use crate::store::MergeStore;

/// Default size of the read buffer.
pub const DEFAULT_READ_CHUNK: usize = 64 * 1024;

/// Reply buffer; a fragment usually goes back in a handful of writes.
const REPLY_BUF_SIZE: usize = 256 * 1024;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub read_chunk_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            read_chunk_size: DEFAULT_READ_CHUNK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSummary {
    pub received: IntakeStats,
    /// Records written back, sentinel excluded.
    pub sent: u64,
}

/// Connect to a coordinator, serve one fragment, then shut down the write
/// side so the coordinator sees the hang-up.
pub fn connect_and_serve(addr: impl ToSocketAddrs, config: &WorkerConfig) -> Result<WorkerSummary> {
    let stream = TcpStream::connect(addr).map_err(|e| Error::transport("connect", e))?;
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "coordinator".to_string());
    info!(%peer, "connected");

    let summary = serve(&stream, &peer, config)?;

    match stream.shutdown(Shutdown::Write) {
        Ok(()) => {}
        // Coordinator already closed on us after reading everything
        Err(e) if e.kind() == io::ErrorKind::NotConnected => {}
        Err(e) => return Err(Error::transport("shutdown", e)),
    }
    info!(
        %peer,
        received = summary.received.accepted,
        sent = summary.sent,
        "fragment returned"
    );
    Ok(summary)
}

/// Run the worker protocol over any byte stream.
/// Reading stops at the sentinel; a stream that ends first is a
/// protocol violation.
pub fn serve<S: Read + Write>(mut stream: S, peer: &str, config: &WorkerConfig) -> Result<WorkerSummary> {
    let mut parser = FramingParser::new();
    let mut intake = Intake::new(peer);
    let mut store = MergeStore::new();
    let mut buf = vec![0u8; config.read_chunk_size.max(1)];

    while !intake.sentinel_received() {
        let n = match stream.read(&mut buf) {
            Ok(0) => return Err(Error::protocol(peer)),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::transport("read fragment", e)),
        };
        parser.feed(&buf[..n], |payload| intake.accept(payload, &mut store));
    }

    if parser.has_pending() {
        warn!(peer, line = %preview(parser.pending()), "discarding data after EOF");
    }
    let received = intake.stats();
    debug!(peer, records = received.accepted, "fragment received");

    let mut out = BufWriter::with_capacity(REPLY_BUF_SIZE, &mut stream);
    let mut sent = 0;
    for record in store.drain() {
        write_full(&mut out, record.payload()).map_err(|e| Error::transport("write results", e))?;
        sent += 1;
    }
    write_full(&mut out, SENTINEL).map_err(|e| Error::transport("write results", e))?;
    out.flush().map_err(|e| Error::transport("write results", e))?;

    Ok(WorkerSummary { received, sent })
}
