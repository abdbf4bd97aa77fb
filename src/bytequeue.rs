//! In-memory byte queue backing the incremental parsers.
//!
//! Every protocol parser in this crate consumes its input through this
//! contract: bytes are appended at the back as they arrive from the
//! transport, and inspected or removed from the front as the parser makes
//! progress. Removal hands out cheap [`Bytes`] views, so body chunks are
//! not copied on their way to the caller.

use bytes::{Buf, Bytes, BytesMut};

/// FIFO byte queue over [`BytesMut`].
#[derive(Debug, Default)]
pub struct ByteQueue {
    buf: BytesMut,
}

impl ByteQueue {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
        }
    }

    /// Append bytes at the back of the queue.
    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of bytes currently queued.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Byte offset of the first occurrence of `needle`, if present.
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        if needle.is_empty() || self.buf.len() < needle.len() {
            return None;
        }
        self.buf.windows(needle.len()).position(|w| w == needle)
    }

    /// Remove and return the first `n` bytes.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `n` bytes are queued; callers check
    /// [`remaining`](Self::remaining) first.
    pub fn pull(&mut self, n: usize) -> Bytes {
        self.buf.split_to(n).freeze()
    }

    /// View up to the first `n` bytes without removing them.
    pub fn peek(&self, n: usize) -> &[u8] {
        &self.buf[..n.min(self.buf.len())]
    }

    /// Drop the first `n` bytes.
    pub fn discard(&mut self, n: usize) {
        self.buf.advance(n);
    }

    /// Remove and return everything queued.
    pub fn take_all(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}
