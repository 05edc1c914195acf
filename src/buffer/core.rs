/// Growable byte buffer for the unterminated tail of a record.
///
/// Growth is expressed as a by-value operation: `grow` consumes the buffer
/// and hands back one with enough room, so there is never a second handle
/// to the old allocation or to its length.
use std::mem;

/// First allocation for a partial record. Most wire lines fit.
pub const INITIAL_CAPACITY: usize = 128;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GrowableBuffer {
    data: Vec<u8>,
}

impl GrowableBuffer {
    pub fn new() -> Self {
        GrowableBuffer { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        GrowableBuffer {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Consume the buffer and return one that can take `amount` more bytes
    /// without reallocating. Contents and length are preserved.
    /// Capacity at least doubles, so a record arriving one byte per read
    /// still costs amortized O(1) per byte.
    #[must_use]
    pub fn grow(self, amount: usize) -> Self {
        let mut data = self.data;
        let needed = data.len() + amount;
        if needed > data.capacity() {
            let target = needed.max(data.capacity() * 2).max(INITIAL_CAPACITY);
            data.reserve_exact(target - data.len());
        }
        GrowableBuffer { data }
    }

    /// Append bytes, growing first if needed.
    pub fn push_slice(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let mut grown = mem::take(self).grow(bytes.len());
        grown.data.extend_from_slice(bytes);
        *self = grown;
    }

    /// Append the final piece of a record and take the whole record out,
    /// leaving the buffer empty for the next one.
    pub fn finish_with(&mut self, tail: &[u8]) -> Vec<u8> {
        self.push_slice(tail);
        mem::take(&mut self.data)
    }

    /// Take the staged bytes, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<u8> {
        mem::take(&mut self.data)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}
