//! Streaming `multipart/form-data` reader.
//!
//! The reader pulls the body one byte at a time and never buffers a whole
//! part. Text fields are handed to a [`FormSink`] in small pieces as they
//! arrive; file fields are collected into a fixed [`UPLOAD_CHUNK_LEN`] chunk
//! that is flushed to the sink every time it fills. The only other memory
//! it holds is a lookahead of at most one delimiter (`CRLF--` plus the
//! boundary) while it decides whether bytes inside a file belong to the
//! file or end it.
//!
//! # States
//!
//! ```text
//! ScanPreamble ─▶ ReadPartHeaders ─┬─▶ ReadTextValue ───┬─▶ ReadPartHeaders
//!                                  └─▶ StreamFileBody ──┴─▶ Done
//!
//! any state ── transport lost ──▶ Aborted
//! ```

use super::error::Error;
use crate::network::{Host, Stream};
use heapless::{Deque, String, Vec};

/// Capacity of the chunk handed to the upload sink.
pub const UPLOAD_CHUNK_LEN: usize = 2048;
/// Longest boundary accepted (RFC 2046 allows 70 characters).
pub const MAX_BOUNDARY_LEN: usize = 70;
/// Longest part header line kept; the rest of a longer line is dropped.
pub const MAX_PART_LINE_LEN: usize = 512;
/// Part metadata longer than these limits is cut at a character boundary.
pub const MAX_NAME_LEN: usize = 64;
pub const MAX_FILENAME_LEN: usize = 255;
pub const MAX_CONTENT_TYPE_LEN: usize = 128;

/// `CRLF--` + boundary, or `--` + boundary + `--`.
const DELIMITER_LEN: usize = MAX_BOUNDARY_LEN + 4;
/// Blank lines tolerated before the first boundary.
const PREAMBLE_RETRIES: usize = 3;
/// Non-blank preamble lines discarded before giving up.
const MAX_PREAMBLE_LINES: usize = 16;
const DEFAULT_CONTENT_TYPE: &str = "text/plain";
const BLOB_FILENAME: &str = "blob";

/// Lifecycle of a file upload as seen by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    /// A file part was recognized; no data yet.
    Start,
    /// [`Upload::data`] holds the next piece of the file.
    Write,
    /// The file is complete and [`Upload::total_size`] is final.
    End,
    /// The client disappeared mid-file; discard what was written.
    Aborted,
}

/// The single file upload in flight.
#[derive(Debug, Clone)]
pub struct Upload {
    status: UploadStatus,
    name: String<MAX_NAME_LEN>,
    filename: String<MAX_FILENAME_LEN>,
    content_type: String<MAX_CONTENT_TYPE_LEN>,
    total_size: usize,
    checksum: u32,
    chunk: Vec<u8, UPLOAD_CHUNK_LEN>,
}

impl Upload {
    fn new(part: &PartHeaders, filename: String<MAX_FILENAME_LEN>) -> Self {
        Self {
            status: UploadStatus::Start,
            name: part.name.clone(),
            filename,
            content_type: part.content_type.clone(),
            total_size: 0,
            checksum: 0,
            chunk: Vec::new(),
        }
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    /// Form field name of the part.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Bytes of every chunk completed before the current one. Final once
    /// the status is [`UploadStatus::End`].
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Fill level of the current chunk.
    pub fn current_size(&self) -> usize {
        self.chunk.len()
    }

    /// The current chunk.
    pub fn data(&self) -> &[u8] {
        &self.chunk
    }

    /// CRC-32 of the first [`total_size`](Upload::total_size) bytes of the file.
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Store one byte; true once the chunk is full.
    fn push(&mut self, byte: u8) -> bool {
        let _ = self.chunk.push(byte);
        self.chunk.is_full()
    }

    /// Fold the delivered chunk into the running totals.
    fn advance(&mut self) {
        let mut hasher = crc32fast::Hasher::new_with_initial(self.checksum);
        hasher.update(&self.chunk);
        self.checksum = hasher.finalize();
        self.total_size += self.chunk.len();
        self.chunk.clear();
    }
}

/// Receives the decoded contents of a multipart body.
pub trait FormSink {
    /// A text field named `name` starts.
    fn begin_field(&mut self, name: &str) -> Result<(), Error>;
    /// More bytes of the current text field.
    fn field_data(&mut self, data: &[u8]) -> Result<(), Error>;
    /// The current text field is complete.
    fn end_field(&mut self) -> Result<(), Error>;
    /// An upload changed status or filled a chunk.
    fn upload(&mut self, upload: &Upload);
}

/// A blocking byte-at-a-time source.
pub trait ByteSource {
    /// The next byte, waiting for it if necessary.
    fn next_byte(&mut self) -> Result<u8, Error>;
}

/// Where the reader is in the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartState {
    ScanPreamble,
    ReadPartHeaders,
    ReadTextValue,
    StreamFileBody,
    Done,
    Aborted,
}

#[derive(Debug, Clone, Default)]
struct PartHeaders {
    name: String<MAX_NAME_LEN>,
    filename: Option<String<MAX_FILENAME_LEN>>,
    content_type: String<MAX_CONTENT_TYPE_LEN>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoundaryLine {
    Next,
    Final,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueLine {
    Content,
    Boundary { last: bool },
}

/// Extract the boundary from a `Content-Type` value.
///
/// `Ok(None)` means the body is not multipart at all. A multipart type
/// without a usable boundary is a malformed request. Quotes around the
/// boundary are stripped.
pub fn parse_boundary(content_type: &str) -> Result<Option<&str>, Error> {
    let mut params = content_type.split(';');
    let main = params.next().unwrap_or("").trim();
    let is_multipart = main
        .get(..10)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("multipart/"));
    if !is_multipart {
        return Ok(None);
    }

    for param in params {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("boundary") {
            let boundary = value.trim().trim_matches('"');
            if boundary.is_empty() || boundary.len() > MAX_BOUNDARY_LEN {
                return Err(Error::MalformedRequest);
            }
            return Ok(Some(boundary));
        }
    }

    Err(Error::MalformedRequest)
}

/// Boundary-driven state machine over one multipart body.
#[derive(Debug)]
pub struct MultipartReader {
    boundary: Vec<u8, MAX_BOUNDARY_LEN>,
    blob_filename: Option<String<MAX_FILENAME_LEN>>,
    state: PartState,
    part: PartHeaders,
}

impl MultipartReader {
    pub fn new(boundary: &str) -> Result<Self, Error> {
        if boundary.is_empty() {
            return Err(Error::MalformedRequest);
        }
        let boundary = Vec::from_slice(boundary.as_bytes()).map_err(|_| Error::MalformedRequest)?;
        Ok(Self {
            boundary,
            blob_filename: None,
            state: PartState::ScanPreamble,
            part: PartHeaders::default(),
        })
    }

    /// Filename to use for parts uploaded as an anonymous `blob`.
    pub fn with_blob_filename(mut self, filename: &str) -> Self {
        self.blob_filename = Some(truncated(filename));
        self
    }

    pub fn state(&self) -> PartState {
        self.state
    }

    /// Consume the body until the final boundary.
    pub fn run<B: ByteSource, K: FormSink>(&mut self, source: &mut B, sink: &mut K) -> Result<(), Error> {
        loop {
            let step = match self.state {
                PartState::ScanPreamble => self.scan_preamble(source).map(|last| {
                    if last {
                        PartState::Done
                    } else {
                        PartState::ReadPartHeaders
                    }
                }),
                PartState::ReadPartHeaders => self.read_part_headers(source).map(|_| {
                    if self.part.filename.is_some() {
                        PartState::StreamFileBody
                    } else {
                        PartState::ReadTextValue
                    }
                }),
                PartState::ReadTextValue => self.read_text_value(source, sink).map(Self::after_part),
                PartState::StreamFileBody => self.stream_file(source, sink).map(Self::after_part),
                PartState::Done => return Ok(()),
                PartState::Aborted => return Err(Error::UploadAborted),
            };

            match step {
                Ok(next) => self.state = next,
                Err(error) => {
                    warn!("multipart failed in {}: {}", self.state as u8, error);
                    self.state = PartState::Aborted;
                    return Err(error);
                }
            }
        }
    }

    fn after_part(last: bool) -> PartState {
        if last {
            PartState::Done
        } else {
            PartState::ReadPartHeaders
        }
    }

    fn boundary_line(&self, line: &[u8]) -> BoundaryLine {
        let Some(rest) = line
            .strip_prefix(b"--")
            .and_then(|rest| rest.strip_prefix(&self.boundary[..]))
        else {
            return BoundaryLine::Other;
        };
        match rest {
            b"" => BoundaryLine::Next,
            b"--" => BoundaryLine::Final,
            _ => BoundaryLine::Other,
        }
    }

    /// Skip to the first boundary line. True if it was already the final one.
    fn scan_preamble<B: ByteSource>(&mut self, source: &mut B) -> Result<bool, Error> {
        let mut line: Vec<u8, MAX_PART_LINE_LEN> = Vec::new();
        let mut blank = 0;
        let mut discarded = 0;

        loop {
            let fits = read_line(source, &mut line)?;
            if fits {
                match self.boundary_line(&line) {
                    BoundaryLine::Next => return Ok(false),
                    BoundaryLine::Final => return Ok(true),
                    BoundaryLine::Other => {}
                }
            }

            if fits && line.is_empty() {
                blank += 1;
                if blank > PREAMBLE_RETRIES {
                    return Err(Error::MalformedRequest);
                }
            } else {
                discarded += 1;
                if discarded > MAX_PREAMBLE_LINES {
                    return Err(Error::MalformedRequest);
                }
            }
        }
    }

    fn read_part_headers<B: ByteSource>(&mut self, source: &mut B) -> Result<(), Error> {
        let mut line: Vec<u8, MAX_PART_LINE_LEN> = Vec::new();
        let mut part = PartHeaders::default();
        let mut disposition = false;

        loop {
            read_line(source, &mut line)?;
            if line.is_empty() {
                break;
            }
            let text = match core::str::from_utf8(&line) {
                Ok(text) => text,
                Err(error) => match core::str::from_utf8(&line[..error.valid_up_to()]) {
                    Ok(text) => text,
                    Err(_) => continue,
                },
            };
            let Some((name, value)) = text.split_once(':') else {
                continue;
            };

            let value = value.trim();
            if name.trim().eq_ignore_ascii_case("Content-Disposition") {
                self.parse_disposition(value, &mut part)?;
                disposition = true;
            } else if name.trim().eq_ignore_ascii_case("Content-Type") {
                part.content_type = truncated(value);
            }
        }

        if !disposition {
            return Err(Error::MalformedRequest);
        }
        if part.content_type.is_empty() {
            part.content_type = truncated(DEFAULT_CONTENT_TYPE);
        }

        debug!(
            "part {=str} file {}",
            part.name.as_str(),
            part.filename.is_some()
        );
        self.part = part;
        Ok(())
    }

    fn parse_disposition(&self, value: &str, part: &mut PartHeaders) -> Result<(), Error> {
        let mut name = None;

        for param in value.split(';') {
            let Some((key, raw)) = param.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let raw = unquote(raw);
            if key.eq_ignore_ascii_case("name") {
                name = Some(raw);
            } else if key.eq_ignore_ascii_case("filename") {
                let filename = match &self.blob_filename {
                    Some(substitute) if raw == BLOB_FILENAME => substitute.clone(),
                    _ => truncated(raw),
                };
                part.filename = Some(filename);
            }
        }

        let name = name.ok_or(Error::MalformedRequest)?;
        part.name = truncated(name);
        Ok(())
    }

    /// Stream a text field to the sink. True if the final boundary ended it.
    fn read_text_value<B: ByteSource, K: FormSink>(&mut self, source: &mut B, sink: &mut K) -> Result<bool, Error> {
        sink.begin_field(&self.part.name)?;

        let mut first = true;
        loop {
            match self.read_value_line(source, sink, first)? {
                ValueLine::Content => first = false,
                ValueLine::Boundary { last } => {
                    sink.end_field()?;
                    return Ok(last);
                }
            }
        }
    }

    /// Read one line of a text value. Lines are held back only while they
    /// could still turn out to be a boundary line; content lines are joined
    /// with a single `\n`.
    fn read_value_line<B: ByteSource, K: FormSink>(
        &self,
        source: &mut B,
        sink: &mut K,
        first: bool,
    ) -> Result<ValueLine, Error> {
        let mut held: Vec<u8, DELIMITER_LEN> = Vec::new();
        let mut spilled = false;

        loop {
            let byte = match source.next_byte() {
                Ok(byte) => byte,
                // a closing boundary may end the body without CRLF
                Err(Error::ConnectionClosed)
                    if !spilled && self.boundary_line(&held) == BoundaryLine::Final =>
                {
                    return Ok(ValueLine::Boundary { last: true });
                }
                Err(error) => return Err(error),
            };
            if byte == b'\r' {
                while source.next_byte()? != b'\n' {}
                break;
            }

            if held.push(byte).is_ok() {
                continue;
            }

            if !spilled {
                spilled = true;
                if !first {
                    sink.field_data(b"\n")?;
                }
            }
            sink.field_data(&held)?;
            held.clear();
            let _ = held.push(byte);
        }

        if !spilled {
            match self.boundary_line(&held) {
                BoundaryLine::Next => return Ok(ValueLine::Boundary { last: false }),
                BoundaryLine::Final => return Ok(ValueLine::Boundary { last: true }),
                BoundaryLine::Other if !first => sink.field_data(b"\n")?,
                BoundaryLine::Other => {}
            }
        }
        sink.field_data(&held)?;
        Ok(ValueLine::Content)
    }

    /// Stream a file part to the sink. True if the final boundary ended it.
    ///
    /// Bytes that might start the delimiter `CRLF--boundary` are held back.
    /// When the next byte breaks the match, the held bytes up to the next
    /// CR become file data and the rest are scanned again, so a boundary
    /// overlapping a false candidate is still found and nothing is lost or
    /// written twice.
    fn stream_file<B: ByteSource, K: FormSink>(&mut self, source: &mut B, sink: &mut K) -> Result<bool, Error> {
        let filename = self.part.filename.clone().unwrap_or_default();
        let mut upload = Upload::new(&self.part, filename);
        debug!("upload start {=str}", upload.filename());
        sink.upload(&upload);
        upload.status = UploadStatus::Write;

        let mut delimiter: Vec<u8, DELIMITER_LEN> = Vec::new();
        let _ = delimiter.extend_from_slice(b"\r\n--");
        let _ = delimiter.extend_from_slice(&self.boundary);

        let mut held: Vec<u8, DELIMITER_LEN> = Vec::new();
        let mut replay: Deque<u8, { DELIMITER_LEN + 1 }> = Deque::new();

        loop {
            let byte = match replay.pop_front() {
                Some(byte) => byte,
                None => match source.next_byte() {
                    Ok(byte) => byte,
                    Err(error) => return Err(abort(&mut upload, sink, error)),
                },
            };

            if byte == delimiter[held.len()] {
                let _ = held.push(byte);
                if held.len() == delimiter.len() {
                    break;
                }
                continue;
            }

            if held.is_empty() {
                write_byte(&mut upload, byte, sink);
                continue;
            }

            // held[0] is the CR that opened the candidate
            let resume = held[1..]
                .iter()
                .position(|b| *b == b'\r')
                .map_or(held.len(), |pos| pos + 1);
            let _ = replay.push_front(byte);
            for b in held[resume..].iter().rev() {
                let _ = replay.push_front(*b);
            }
            for b in &held[..resume] {
                write_byte(&mut upload, *b, sink);
            }
            held.clear();
        }

        if upload.current_size() > 0 {
            sink.upload(&upload);
            upload.advance();
        }
        upload.status = UploadStatus::End;
        debug!("upload end {=str} {}", upload.filename(), upload.total_size());
        sink.upload(&upload);

        self.read_boundary_tail(source)
    }

    /// After a file delimiter: `--` closes the body, CRLF starts another part.
    fn read_boundary_tail<B: ByteSource>(&self, source: &mut B) -> Result<bool, Error> {
        let mut byte = source.next_byte()?;
        if byte == b'-' {
            byte = source.next_byte()?;
            if byte == b'-' {
                return Ok(true);
            }
        }
        while byte != b'\n' {
            byte = source.next_byte()?;
        }
        Ok(false)
    }
}

fn write_byte<K: FormSink>(upload: &mut Upload, byte: u8, sink: &mut K) {
    if upload.push(byte) {
        sink.upload(upload);
        upload.advance();
    }
}

fn abort<K: FormSink>(upload: &mut Upload, sink: &mut K, error: Error) -> Error {
    warn!(
        "upload aborted {=str} after {} bytes: {}",
        upload.filename(),
        upload.total_size() + upload.current_size(),
        error
    );
    upload.status = UploadStatus::Aborted;
    sink.upload(upload);
    Error::UploadAborted
}

/// Read up to CRLF into `line`. False if the line did not fit; the excess
/// bytes are consumed but dropped.
fn read_line<B: ByteSource, const N: usize>(source: &mut B, line: &mut Vec<u8, N>) -> Result<bool, Error> {
    line.clear();
    let mut fits = true;

    loop {
        let byte = source.next_byte()?;
        if byte == b'\r' {
            break;
        }
        if line.push(byte).is_err() {
            fits = false;
        }
    }
    while source.next_byte()? != b'\n' {}

    Ok(fits)
}

/// Strip surrounding quotes. A value cut short may have lost its closing one.
fn unquote(value: &str) -> &str {
    let value = value.trim();
    match value.strip_prefix('"') {
        Some(inner) => inner.strip_suffix('"').unwrap_or(inner),
        None => value,
    }
}

/// Copy as many whole characters of `value` as fit.
fn truncated<const N: usize>(value: &str) -> String<N> {
    let mut out = String::new();
    for c in value.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Feeds the reader from bytes that arrived with the request head, then
/// from the transport, waiting at most `idle_timeout_ms` for each byte.
/// The body ends after `remaining` bytes, which reads as a closed connection.
pub(crate) struct StreamSource<'a, S, H> {
    prefetched: alloc::vec::Vec<u8>,
    pos: usize,
    remaining: usize,
    stream: &'a mut S,
    host: &'a mut H,
    idle_timeout_ms: u64,
}

impl<'a, S: Stream, H: Host> StreamSource<'a, S, H> {
    pub(crate) fn new(
        prefetched: alloc::vec::Vec<u8>,
        length: usize,
        stream: &'a mut S,
        host: &'a mut H,
        idle_timeout_ms: u64,
    ) -> Self {
        Self {
            prefetched,
            pos: 0,
            remaining: length,
            stream,
            host,
            idle_timeout_ms,
        }
    }
}

impl<S: Stream, H: Host> ByteSource for StreamSource<'_, S, H> {
    fn next_byte(&mut self) -> Result<u8, Error> {
        if self.remaining == 0 {
            return Err(Error::ConnectionClosed);
        }
        let byte = self.poll_byte()?;
        self.remaining -= 1;
        Ok(byte)
    }
}

impl<S: Stream, H: Host> StreamSource<'_, S, H> {
    fn poll_byte(&mut self) -> Result<u8, Error> {
        if let Some(byte) = self.prefetched.get(self.pos) {
            self.pos += 1;
            return Ok(*byte);
        }
        if !self.prefetched.is_empty() {
            self.prefetched = alloc::vec::Vec::new();
            self.pos = 0;
        }

        let started = self.host.millis();
        loop {
            if self.stream.available() > 0 {
                let mut byte = [0u8; 1];
                match self.stream.read(&mut byte) {
                    Ok(1) => return Ok(byte[0]),
                    Ok(_) => {}
                    Err(_) => return Err(Error::ConnectionClosed),
                }
            } else if !self.stream.connected() {
                return Err(Error::ConnectionClosed);
            }

            if self.host.millis().saturating_sub(started) > self.idle_timeout_ms {
                return Err(Error::Timeout);
            }
            self.host.yield_now();
        }
    }
}
