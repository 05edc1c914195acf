/// Wire records: `"<decimal index> <content>\n"`, plus the `"EOF\n"` sentinel
/// that ends each direction of a connection.
use thiserror::Error;

/// Line terminator; also the framing boundary.
pub const TERMINATOR: u8 = b'\n';

/// Separates the index prefix from the content.
pub const SEPARATOR: u8 = b' ';

/// End-of-stream record, used coordinator→worker and worker→coordinator.
pub const SENTINEL: &[u8] = b"EOF\n";

/// Longest preview of a rejected line included in diagnostics.
const PREVIEW_LEN: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecordFormatError {
    #[error("no separator after the line index")]
    MissingSeparator,
    #[error("line index is not a decimal integer")]
    InvalidIndex,
    #[error("line index does not fit in 64 bits")]
    IndexOverflow,
}

/// One indexed line. `payload` is the full wire line, index prefix and
/// terminator included, so it can be forwarded without re-encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    index: u64,
    payload: Vec<u8>,
}

impl Record {
    /// Build a record from an already-validated index and its wire line.
    pub fn new(index: u64, payload: Vec<u8>) -> Self {
        Record { index, payload }
    }

    /// Parse the index prefix of a complete wire line, taking ownership of it.
    /// On failure the line is handed back with the reason.
    pub fn parse(payload: Vec<u8>) -> Result<Record, (RecordFormatError, Vec<u8>)> {
        match parse_index(&payload) {
            Ok(index) => Ok(Record { index, payload }),
            Err(e) => Err((e, payload)),
        }
    }

    #[inline]
    pub fn index(&self) -> u64 {
        self.index
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Bytes after the first separator: the original line plus terminator.
    #[inline]
    pub fn content(&self) -> Option<&[u8]> {
        memchr::memchr(SEPARATOR, &self.payload).map(|pos| &self.payload[pos + 1..])
    }

    /// Append `"<index> <content>\n"` to `out`.
    /// `content` must not contain the terminator.
    pub fn encode(index: u64, content: &[u8], out: &mut Vec<u8>) {
        let mut itoa_buf = itoa::Buffer::new();
        out.extend_from_slice(itoa_buf.format(index).as_bytes());
        out.push(SEPARATOR);
        out.extend_from_slice(content);
        out.push(TERMINATOR);
    }
}

/// Parse the leading decimal index up to the first separator.
pub fn parse_index(payload: &[u8]) -> Result<u64, RecordFormatError> {
    let sep = memchr::memchr(SEPARATOR, payload).ok_or(RecordFormatError::MissingSeparator)?;
    let digits = &payload[..sep];
    if digits.is_empty() {
        return Err(RecordFormatError::InvalidIndex);
    }

    let mut value: u64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(RecordFormatError::InvalidIndex);
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(b - b'0')))
            .ok_or(RecordFormatError::IndexOverflow)?;
    }
    Ok(value)
}

/// What one complete wire line turned out to be.
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    Sentinel,
    Record(Record),
    Malformed(RecordFormatError, Vec<u8>),
}

/// Classify a complete line emitted by the framing parser.
pub fn classify(payload: Vec<u8>) -> Frame {
    if payload == SENTINEL {
        return Frame::Sentinel;
    }
    match Record::parse(payload) {
        Ok(record) => Frame::Record(record),
        Err((e, payload)) => Frame::Malformed(e, payload),
    }
}

/// Short, lossy rendering of a wire line for log messages.
pub fn preview(payload: &[u8]) -> String {
    let end = payload.len().min(PREVIEW_LEN);
    let body = payload[..end]
        .strip_suffix(&[TERMINATOR])
        .unwrap_or(&payload[..end]);
    let mut s = String::from_utf8_lossy(body).into_owned();
    if payload.len() > PREVIEW_LEN {
        s.push_str("...");
    }
    s
}
