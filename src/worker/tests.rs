use super::*;
use crate::error::Error;
use std::io::{self, Cursor, Read, Write};

/// In-memory duplex stream: reads come from `input`, writes land in
/// `output`. `read_limit` caps each read to exercise framing across reads.
struct MockStream {
    input: Cursor<Vec<u8>>,
    output: Vec<u8>,
    read_limit: usize,
}

impl MockStream {
    fn new(input: &[u8], read_limit: usize) -> Self {
        MockStream {
            input: Cursor::new(input.to_vec()),
            output: Vec::new(),
            read_limit,
        }
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.read_limit);
        self.input.read(&mut buf[..n])
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn run_worker(input: &[u8], read_limit: usize) -> (WorkerSummary, Vec<u8>) {
    let mut stream = MockStream::new(input, read_limit);
    let summary = serve(&mut stream, "mock", &WorkerConfig::default()).unwrap();
    (summary, stream.output)
}

#[test]
fn test_worker_orders_by_index() {
    let (summary, out) = run_worker(b"7 seven\n2 two\n5 five\nEOF\n", usize::MAX);
    assert_eq!(out, b"2 two\n5 five\n7 seven\nEOF\n");
    assert_eq!(summary.sent, 3);
    assert_eq!(summary.received.accepted, 3);
}

#[test]
fn test_worker_one_byte_reads() {
    let (_, out) = run_worker(b"1 b\n0 a\nEOF\n", 1);
    assert_eq!(out, b"0 a\n1 b\nEOF\n");
}

#[test]
fn test_worker_empty_fragment() {
    let (summary, out) = run_worker(b"EOF\n", usize::MAX);
    assert_eq!(out, b"EOF\n");
    assert_eq!(summary.sent, 0);
}

#[test]
fn test_worker_drops_malformed_and_duplicates() {
    let (summary, out) = run_worker(b"1 one\nbanana\n1 uno\n0 zero\nEOF\n", 4);
    assert_eq!(out, b"0 zero\n1 one\nEOF\n");
    assert_eq!(summary.received.malformed, 1);
    assert_eq!(summary.received.duplicates, 1);
}

#[test]
fn test_worker_ignores_bytes_after_sentinel() {
    let (summary, out) = run_worker(b"0 a\nEOF\n9 late\n", usize::MAX);
    assert_eq!(out, b"0 a\nEOF\n");
    assert_eq!(summary.received.after_sentinel, 1);
}

#[test]
fn test_worker_eof_before_sentinel_is_protocol_violation() {
    let mut stream = MockStream::new(b"0 a\n1 b\nEO", usize::MAX);
    let err = serve(&mut stream, "mock", &WorkerConfig::default()).unwrap_err();
    assert!(matches!(err, Error::ProtocolViolation { .. }), "{}", err);
    assert_eq!(err.exit_code(), crate::error::EXIT_PROTOCOL);
    assert!(stream.output.is_empty());
}

#[test]
fn test_worker_small_read_chunk_config() {
    let mut stream = MockStream::new(b"3 c\n1 a\n2 b\nEOF\n", usize::MAX);
    let config = WorkerConfig { read_chunk_size: 3 };
    let summary = serve(&mut stream, "mock", &config).unwrap();
    assert_eq!(summary.sent, 3);
    assert_eq!(stream.output, b"1 a\n2 b\n3 c\nEOF\n");
}
