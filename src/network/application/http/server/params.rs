//! Query string and form body parameters.
//!
//! A request's parameters can come from up to three places, always in this
//! order: the query string, then an url-encoded body or the text fields of a
//! multipart body. They all land in one [`ParamTable`] so handlers see a
//! single merged list. Lookup by name returns the first match, so a query
//! argument shadows a body argument of the same name.
//!
//! A field written as `flag` has a key and no value, while `flag=` has an
//! empty value; [`ParamTable::has`] is true for both.

use super::buffer::Span;
use super::error::Error;
use super::url::decode_in_place;
use alloc::vec::Vec;

/// One decoded parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamEntry {
    pub key: Span,
    pub value: Option<Span>,
}

#[derive(Debug, Default)]
pub struct ParamTable {
    entries: Vec<ParamEntry>,
}

impl ParamTable {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of `&`-separated fields in `segment`; zero only when empty.
    pub fn count(segment: &[u8]) -> usize {
        if segment.is_empty() {
            return 0;
        }
        1 + segment.iter().filter(|byte| **byte == b'&').count()
    }

    /// Split `segment` of `buffer` into decoded parameters.
    ///
    /// With `reset` the table starts over, otherwise the new fields are
    /// appended after the existing ones. Keys and values are URL-decoded in
    /// place, so the segment must not be tokenized twice. Returns the offset
    /// just past the segment.
    pub fn tokenize(&mut self, buffer: &mut [u8], segment: Span, reset: bool) -> Result<usize, Error> {
        if reset {
            self.reset();
        }

        let bytes = segment.get(buffer).ok_or(Error::MalformedRequest)?;
        let count = Self::count(bytes);
        if count == 0 {
            return Ok(segment.end());
        }
        self.entries
            .try_reserve_exact(count)
            .map_err(|_| Error::ResourceExhausted)?;

        let mut field_start = segment.start();
        let mut equals: Option<usize> = None;

        for pos in segment.start()..=segment.end() {
            let byte = buffer.get(pos).copied().filter(|_| pos < segment.end());
            match byte {
                Some(b'&') | None => {
                    let entry = Self::decode_field(buffer, field_start, equals, pos);
                    self.entries.push(entry);
                    field_start = pos + 1;
                    equals = None;
                }
                Some(b'=') if equals.is_none() => equals = Some(pos),
                Some(_) => {}
            }
        }

        Ok(segment.end())
    }

    fn decode_field(buffer: &mut [u8], start: usize, equals: Option<usize>, end: usize) -> ParamEntry {
        let key_end = equals.unwrap_or(end);
        let key_len = decode_in_place(&mut buffer[start..key_end]);
        let value = equals.map(|equals| {
            let value_start = equals + 1;
            let value_len = decode_in_place(&mut buffer[value_start..end]);
            Span::new(value_start, value_len)
        });

        ParamEntry {
            key: Span::new(start, key_len),
            value,
        }
    }

    /// Add one already-decoded parameter after the existing ones.
    pub fn append(&mut self, key: Span, value: Option<Span>) -> Result<(), Error> {
        self.entries
            .try_reserve(1)
            .map_err(|_| Error::ResourceExhausted)?;
        self.entries.push(ParamEntry { key, value });
        Ok(())
    }

    /// Overwrite the entry at `index`; an index equal to the current total
    /// appends instead.
    pub fn set(&mut self, index: usize, key: Span, value: Option<Span>) -> Result<(), Error> {
        if index == self.entries.len() {
            return self.append(key, value);
        }
        match self.entries.get_mut(index) {
            Some(entry) => {
                *entry = ParamEntry { key, value };
                Ok(())
            }
            None => Err(Error::MalformedRequest),
        }
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn entry_at(&self, index: usize) -> Option<ParamEntry> {
        self.entries.get(index).copied()
    }

    pub fn key<'b>(&self, buffer: &'b [u8], index: usize) -> Option<&'b [u8]> {
        self.entries.get(index)?.key.get(buffer)
    }

    pub fn value_at<'b>(&self, buffer: &'b [u8], index: usize) -> Option<&'b [u8]> {
        self.entries.get(index)?.value?.get(buffer)
    }

    /// Value of the first parameter named `name`.
    ///
    /// `None` both when there is no such parameter and when the first one
    /// was written without `=`; use [`ParamTable::has`] to tell them apart.
    pub fn value<'b>(&self, buffer: &'b [u8], name: &[u8]) -> Option<&'b [u8]> {
        self.position(buffer, name)
            .and_then(|index| self.value_at(buffer, index))
    }

    pub fn has(&self, buffer: &[u8], name: &[u8]) -> bool {
        self.position(buffer, name).is_some()
    }

    fn position(&self, buffer: &[u8], name: &[u8]) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.key.get(buffer) == Some(name))
    }
}
