use super::record::TERMINATOR;
use crate::buffer::GrowableBuffer;

/// Incremental line framer for a byte stream with no read boundaries.
///
/// Bytes after the last terminator of a chunk are staged in a
/// [`GrowableBuffer`]; the staged part never contains a terminator, so each
/// new chunk is scanned from its own start only. The records produced are
/// the same however the stream was split across reads.
#[derive(Debug, Default)]
pub struct FramingParser {
    partial: GrowableBuffer,
    emitted: u64,
}

impl FramingParser {
    pub fn new() -> Self {
        FramingParser {
            partial: GrowableBuffer::new(),
            emitted: 0,
        }
    }

    /// Feed one chunk. `emit` receives every record completed by this chunk,
    /// terminator included, in stream order. Returns how many were emitted.
    pub fn feed<F>(&mut self, chunk: &[u8], mut emit: F) -> usize
    where
        F: FnMut(Vec<u8>),
    {
        let mut start = 0;
        let mut count = 0;

        for end in memchr::memchr_iter(TERMINATOR, chunk) {
            let piece = &chunk[start..=end];
            let line = if self.partial.is_empty() {
                piece.to_vec()
            } else {
                self.partial.finish_with(piece)
            };
            emit(line);
            count += 1;
            start = end + 1;
        }

        if start < chunk.len() {
            self.partial.push_slice(&chunk[start..]);
        }

        self.emitted += count as u64;
        count
    }

    /// Bytes of the record currently in progress.
    #[inline]
    pub fn pending(&self) -> &[u8] {
        self.partial.as_slice()
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.partial.is_empty()
    }

    /// Total records emitted over the parser's lifetime.
    #[inline]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}
