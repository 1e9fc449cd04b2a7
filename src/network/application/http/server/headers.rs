//! Header block tokenizer.
//!
//! The table records one entry per CRLF-terminated line of the request head.
//! Entry zero is the request line itself and is kept whole; every later line
//! is split at its first `:` into a name and a value, with the spaces after
//! the colon skipped. Names are compared case-insensitively and the first
//! matching entry wins, even when a later duplicate was also recorded.

use super::buffer::Span;
use super::error::Error;
use alloc::vec::Vec;

const CRLF: &[u8] = b"\r\n";

/// One header line: a name and, if the line had a colon, a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderEntry {
    pub key: Span,
    pub value: Option<Span>,
}

#[derive(Debug, Default)]
pub struct HeaderTable {
    entries: Vec<HeaderEntry>,
}

impl HeaderTable {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Count the lines of the head up to the blank line that ends it.
    ///
    /// The blank line itself is not counted. An empty buffer has no lines.
    pub fn count(buffer: &[u8]) -> usize {
        let mut total = 0;
        let mut pos = 0;

        while pos + 1 < buffer.len() {
            if &buffer[pos..pos + 2] == CRLF {
                total += 1;
                pos += 2;
                if buffer[pos..].starts_with(CRLF) {
                    break;
                }
            } else {
                pos += 1;
            }
        }

        total
    }

    /// Tokenize the head at the front of `buffer` into this table.
    ///
    /// Returns the offset just past the terminating blank line, which is
    /// where the body starts. If the head is not terminated, only the lines
    /// closed so far are recorded and the buffer length is returned. Any
    /// previous contents are discarded first.
    pub fn tokenize(&mut self, buffer: &[u8]) -> Result<usize, Error> {
        self.reset();

        let count = Self::count(buffer);
        if count == 0 {
            return Ok(0);
        }
        self.entries
            .try_reserve_exact(count)
            .map_err(|_| Error::ResourceExhausted)?;

        let mut line_start = 0;
        let mut colon: Option<usize> = None;
        let mut pos = 0;

        while pos + 1 < buffer.len() {
            match buffer[pos] {
                b'\r' if buffer[pos + 1] == b'\n' => {
                    self.entries.push(Self::entry(buffer, line_start, colon, pos));
                    pos += 2;

                    if buffer[pos..].starts_with(CRLF) {
                        return Ok(pos + 2);
                    }

                    line_start = pos;
                    colon = None;
                }
                // the request line is never split
                b':' if colon.is_none() && !self.entries.is_empty() => {
                    colon = Some(pos);
                    pos += 1;
                }
                _ => pos += 1,
            }
        }

        Ok(buffer.len())
    }

    fn entry(buffer: &[u8], line_start: usize, colon: Option<usize>, line_end: usize) -> HeaderEntry {
        match colon {
            Some(colon) => {
                let mut value_start = colon + 1;
                while value_start < line_end && buffer[value_start] == b' ' {
                    value_start += 1;
                }
                HeaderEntry {
                    key: Span::between(line_start, colon),
                    value: Some(Span::between(value_start, line_end)),
                }
            }
            None => HeaderEntry {
                key: Span::between(line_start, line_end),
                value: None,
            },
        }
    }

    /// Forget every entry.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Number of recorded lines, request line included.
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn entry_at(&self, index: usize) -> Option<HeaderEntry> {
        self.entries.get(index).copied()
    }

    /// The name (or, for entry zero, the whole request line) at `index`.
    pub fn key<'b>(&self, buffer: &'b [u8], index: usize) -> Option<&'b [u8]> {
        self.entries.get(index)?.key.get(buffer)
    }

    pub fn value_at<'b>(&self, buffer: &'b [u8], index: usize) -> Option<&'b [u8]> {
        self.entries.get(index)?.value?.get(buffer)
    }

    /// Value of the first header named `name`, compared case-insensitively.
    pub fn value<'b>(&self, buffer: &'b [u8], name: &str) -> Option<&'b [u8]> {
        self.position(buffer, name)
            .and_then(|index| self.value_at(buffer, index))
    }

    pub fn has(&self, buffer: &[u8], name: &str) -> bool {
        self.position(buffer, name).is_some()
    }

    fn position(&self, buffer: &[u8], name: &str) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, entry)| {
                entry
                    .key
                    .get(buffer)
                    .is_some_and(|key| key.eq_ignore_ascii_case(name.as_bytes()))
            })
            .map(|(index, _)| index)
    }
}
