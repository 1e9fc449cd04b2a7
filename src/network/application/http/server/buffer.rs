//! The growable request buffer and the spans that point into it.
//!
//! One contiguous allocation holds the whole in-flight request. Every token
//! produced by the parsers is a [`Span`] (offset plus length) into that
//! allocation rather than a pointer, so growing the buffer never invalidates
//! a token; releasing it does, which is why readers only ever see token
//! bytes through a borrow of the owning engine.

use super::error::Error;
use alloc::vec::Vec;

/// A view into a [`RequestBuffer`]: `len` bytes starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    start: usize,
    len: usize,
}

impl Span {
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// Span covering `start..end`. An inverted range yields an empty span.
    pub fn between(start: usize, end: usize) -> Self {
        Self {
            start,
            len: end.saturating_sub(start),
        }
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The bytes this span covers, or `None` if it does not fit in `bytes`.
    pub fn get<'b>(&self, bytes: &'b [u8]) -> Option<&'b [u8]> {
        bytes.get(self.start..self.end())
    }
}

/// Owned, monotonically growing storage for one request.
///
/// Growth is purely additive: the allocation is extended by exactly the
/// number of bytes asked for. When growth fails, either because the
/// allocator refuses or because the configured ceiling would be crossed,
/// the previous allocation is released before the error is returned, so a
/// failed request never leaks its partial buffer.
#[derive(Debug, Default)]
pub struct RequestBuffer {
    bytes: Vec<u8>,
    limit: usize,
}

impl RequestBuffer {
    /// An empty buffer that refuses to grow past `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes currently allocated, including reserved but unused space.
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Extend the buffer by `extra` zeroed bytes and return them for filling.
    pub fn grow(&mut self, extra: usize) -> Result<&mut [u8], Error> {
        let old = self.bytes.len();
        let wanted = match old.checked_add(extra) {
            Some(wanted) if wanted <= self.limit => wanted,
            _ => {
                self.release();
                return Err(Error::ResourceExhausted);
            }
        };

        if self.bytes.try_reserve_exact(extra).is_err() {
            self.release();
            return Err(Error::ResourceExhausted);
        }

        self.bytes.resize(wanted, 0);
        Ok(&mut self.bytes[old..])
    }

    /// Append `data` and return the span it now occupies.
    pub fn append(&mut self, data: &[u8]) -> Result<Span, Error> {
        let start = self.bytes.len();
        self.grow(data.len())?.copy_from_slice(data);
        Ok(Span::new(start, data.len()))
    }

    /// Drop bytes past `len`. Capacity is kept.
    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    /// Move every byte from `at` onward into a separate allocation.
    pub(crate) fn split_off(&mut self, at: usize) -> Vec<u8> {
        if at >= self.bytes.len() {
            return Vec::new();
        }
        self.bytes.split_off(at)
    }

    /// Free the allocation. Every span handed out so far becomes meaningless.
    pub fn release(&mut self) {
        self.bytes = Vec::new();
    }

    /// Position of the first `needle` at or after `from`.
    pub fn find(&self, from: usize, needle: &[u8]) -> Option<usize> {
        let haystack = self.bytes.get(from..)?;
        find_slice(haystack, needle).map(|pos| from + pos)
    }
}

/// Finds the first occurrence of a slice in another slice and returns its starting position.
pub(crate) fn find_slice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
