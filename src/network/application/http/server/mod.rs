//! Single-client HTTP/1.1 request engine.
//!
//! [`Server`] turns the bytes of one accepted client into a parsed
//! [`Request`] and hands it to the first matching [`Handler`]. It owns one
//! growable buffer per request; the header table and the parameter table
//! only hold spans into it, so a request costs one allocation for the bytes
//! and one for each table.
//!
//! # Parsing
//!
//! 1. Read until the head is terminated by a blank line, within
//!    [`Config::header_timeout_ms`].
//! 2. Tokenize the head, split the request line, decode the query string.
//! 3. Pick the handler for the method and path.
//! 4. Read the body as announced by `Content-Length`:
//!    - `application/x-www-form-urlencoded` is decoded into parameters;
//!    - `multipart/form-data` is streamed, text fields become parameters
//!      and files go to the handler's upload callback;
//!    - anything else is kept as the raw body.
//!
//! Every failure releases the buffer and maps to a status code through
//! [`Outcome::status_code`]. Leftover input is drained either way.
//!
//! # Example
//!
//! ```rust,no_run
//! use libiot_httpd::network::application::http::{Method, Server};
//! # use libiot_httpd::network::{Host, Read, Stream, Write};
//! # struct Clock;
//! # impl Host for Clock {
//! #     fn millis(&mut self) -> u64 { 0 }
//! #     fn yield_now(&mut self) {}
//! # }
//! # struct Client;
//! # impl Read for Client {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # impl Write for Client {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl Stream for Client {
//! #     fn available(&mut self) -> usize { 0 }
//! #     fn connected(&mut self) -> bool { false }
//! # }
//!
//! let mut server = Server::new(Clock);
//! server.on("/led", Method::Post, |request| {
//!     request.arg("state") == Some("on")
//! });
//!
//! let mut client = Client;
//! let outcome = server.handle_client(&mut client);
//! let _status = outcome.status_code();
//! ```

pub mod buffer;
pub mod error;
pub mod handler;
pub mod headers;
pub mod multipart;
pub mod params;
pub mod request;
pub mod url;

use crate::config::Config;
use crate::network::{Host, Stream};
use alloc::boxed::Box;
use alloc::vec::Vec;
use buffer::{RequestBuffer, Span};
use error::Error;
use handler::{FunctionHandler, Handler, HandlerFn};
use headers::HeaderTable;
use multipart::{FormSink, MultipartReader, StreamSource, Upload};
use params::ParamTable;
use request::{Request, RequestLine};

use super::method::Method;

/// Bytes requested from the allocator per read while waiting for input.
const READ_CHUNK_LEN: usize = 512;
const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Engine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    ReadingHeaders,
    ReadingBody,
    /// Parsed, with or without a body, and not yet dispatched.
    Ready,
    Dispatched,
}

/// Result of serving one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A handler accepted the request.
    Handled,
    /// No handler accepted it; the not-found callback ran if there is one.
    NotFound,
    /// Parsing failed before any handler ran.
    Failed(Error),
}

impl Outcome {
    pub fn status_code(&self) -> u16 {
        match self {
            Outcome::Handled => 200,
            Outcome::NotFound => 404,
            Outcome::Failed(error) => error.status_code(),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Outcome {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Outcome::Handled => defmt::write!(f, "Handled"),
            Outcome::NotFound => defmt::write!(f, "NotFound"),
            Outcome::Failed(error) => defmt::write!(f, "Failed({})", error),
        }
    }
}

#[derive(Debug)]
enum BodyKind {
    Form,
    Multipart(MultipartReader),
    Opaque,
}

/// HTTP request engine for one client at a time.
pub struct Server<H: Host> {
    config: Config,
    host: H,
    buffer: RequestBuffer,
    headers: HeaderTable,
    params: ParamTable,
    line: RequestLine,
    body: Option<Span>,
    handlers: Vec<Box<dyn Handler>>,
    not_found: Option<HandlerFn>,
    matched: Option<usize>,
    state: State,
}

impl<H: Host> core::fmt::Debug for Server<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("buffered", &self.buffer.len())
            .field("handlers", &self.handlers.len())
            .field("matched", &self.matched)
            .finish()
    }
}

impl<H: Host> Server<H> {
    /// Create a server with the default [`Config`].
    pub fn new(host: H) -> Self {
        Self::with_config(Config::default(), host)
    }

    pub fn with_config(config: Config, host: H) -> Self {
        Self {
            config,
            host,
            buffer: RequestBuffer::with_limit(config.max_request_len),
            headers: HeaderTable::new(),
            params: ParamTable::new(),
            line: RequestLine::default(),
            body: None,
            handlers: Vec::new(),
            not_found: None,
            matched: None,
            state: State::Idle,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Serve `uri` requests made with `method`. A trailing `*` in `uri`
    /// matches every path with that prefix.
    pub fn on(&mut self, uri: &str, method: Method, handler: impl FnMut(&Request<'_>) -> bool + 'static) {
        self.add_handler(Box::new(FunctionHandler::new(uri, method, handler)));
    }

    /// Like [`Server::on`], additionally receiving multipart file uploads.
    pub fn on_upload(
        &mut self,
        uri: &str,
        method: Method,
        handler: impl FnMut(&Request<'_>) -> bool + 'static,
        upload: impl FnMut(&Request<'_>, &Upload) + 'static,
    ) {
        let handler = FunctionHandler::new(uri, method, handler).with_upload(upload);
        self.add_handler(Box::new(handler));
    }

    /// Register a handler. Handlers are consulted in registration order.
    pub fn add_handler(&mut self, handler: Box<dyn Handler>) {
        self.handlers.push(handler);
    }

    /// Called for requests that no handler accepted.
    pub fn on_not_found(&mut self, handler: impl FnMut(&Request<'_>) -> bool + 'static) {
        self.not_found = Some(Box::new(handler));
    }

    /// Storage backing the current request.
    pub fn buffer(&self) -> &RequestBuffer {
        &self.buffer
    }

    /// The request parsed last. Empty after [`Server::reset`] or a failure.
    pub fn request(&self) -> Request<'_> {
        Request::new(
            self.buffer.as_slice(),
            &self.headers,
            &self.params,
            &self.line,
            self.body,
            None,
        )
    }

    /// Forget the current request and free its buffer.
    pub fn reset(&mut self) {
        self.headers.reset();
        self.params.reset();
        self.line = RequestLine::default();
        self.body = None;
        self.matched = None;
        self.buffer.release();
        self.state = State::Idle;
    }

    /// Parse one request from `stream` and dispatch it.
    pub fn handle_client<S: Stream>(&mut self, stream: &mut S) -> Outcome {
        if let Err(error) = self.parse_request(stream) {
            return Outcome::Failed(error);
        }
        let outcome = self.dispatch();
        debug!("request served: {}", outcome);
        outcome
    }

    /// Parse one request from `stream` without dispatching it.
    ///
    /// Multipart uploads are still delivered to the matching handler while
    /// the body streams in. On failure the request is reset.
    pub fn parse_request<S: Stream>(&mut self, stream: &mut S) -> Result<(), Error> {
        self.reset();

        let result = self.read_request(stream);
        if let Err(error) = result {
            warn!("request failed: {}", error);
            self.reset();
        }
        drain(stream);

        result
    }

    fn read_request<S: Stream>(&mut self, stream: &mut S) -> Result<(), Error> {
        self.state = State::ReadingHeaders;
        self.read_head(stream)?;

        let body_start = self.headers.tokenize(self.buffer.as_slice())?;
        let request_line = self
            .headers
            .entry_at(0)
            .ok_or(Error::MalformedRequest)?
            .key;
        self.line = RequestLine::parse(self.buffer.as_slice(), request_line)?;
        debug!(
            "request {=str} {=str}",
            self.line.method().as_str(),
            self.line.path(self.buffer.as_slice())
        );

        if let Some(query) = self.line.query() {
            self.params
                .tokenize(self.buffer.as_mut_slice(), query, true)?;
        }

        self.matched = self.resolve_handler();
        self.read_body(stream, body_start)?;

        self.state = State::Ready;
        Ok(())
    }

    /// Grow the buffer until it holds the blank line ending the head.
    fn read_head<S: Stream>(&mut self, stream: &mut S) -> Result<usize, Error> {
        let started = self.host.millis();
        let mut scan_from = 0;

        loop {
            if let Some(pos) = self.buffer.find(scan_from, HEAD_TERMINATOR) {
                return Ok(pos + HEAD_TERMINATOR.len());
            }
            // the terminator may straddle two reads
            scan_from = self.buffer.len().saturating_sub(HEAD_TERMINATOR.len() - 1);
            self.fill(stream, started, u64::from(self.config.header_timeout_ms))?;
        }
    }

    /// Wait for input and append what is available to the buffer.
    fn fill<S: Stream>(&mut self, stream: &mut S, started: u64, timeout_ms: u64) -> Result<usize, Error> {
        loop {
            let available = stream.available();
            if available > 0 {
                let old_len = self.buffer.len();
                let room = self.buffer.limit().saturating_sub(old_len);
                let want = available.min(READ_CHUNK_LEN).min(room.max(1));
                let tail = self.buffer.grow(want)?;

                match stream.read(tail) {
                    Ok(read) if read > 0 => {
                        self.buffer.truncate(old_len + read);
                        trace!("read {} bytes", read);
                        return Ok(read);
                    }
                    Ok(_) => self.buffer.truncate(old_len),
                    Err(_) => {
                        self.buffer.truncate(old_len);
                        return Err(Error::ConnectionClosed);
                    }
                }
            } else if !stream.connected() {
                return Err(Error::ConnectionClosed);
            }

            if self.host.millis().saturating_sub(started) > timeout_ms {
                return Err(Error::Timeout);
            }
            self.host.yield_now();
        }
    }

    fn resolve_handler(&self) -> Option<usize> {
        let path = self.line.path(self.buffer.as_slice());
        self.handlers
            .iter()
            .position(|handler| handler.can_handle(self.line.method(), path))
    }

    fn content_length(&self) -> Result<Option<usize>, Error> {
        let Some(value) = self.headers.value(self.buffer.as_slice(), "Content-Length") else {
            return Ok(None);
        };
        core::str::from_utf8(value)
            .ok()
            .and_then(|value| value.trim().parse().ok())
            .map(Some)
            .ok_or(Error::MalformedRequest)
    }

    fn body_kind(&self) -> Result<BodyKind, Error> {
        let content_type = self
            .headers
            .value(self.buffer.as_slice(), "Content-Type")
            .and_then(|value| core::str::from_utf8(value).ok());
        let Some(content_type) = content_type else {
            return Ok(BodyKind::Opaque);
        };

        let main = content_type.split(';').next().unwrap_or("").trim();
        if main.eq_ignore_ascii_case(FORM_URLENCODED) {
            return Ok(BodyKind::Form);
        }
        match multipart::parse_boundary(content_type)? {
            Some(boundary) => {
                let mut reader = MultipartReader::new(boundary)?;
                let substitute = self
                    .params
                    .value(self.buffer.as_slice(), b"filename")
                    .and_then(|name| core::str::from_utf8(name).ok());
                if let Some(substitute) = substitute {
                    reader = reader.with_blob_filename(substitute);
                }
                Ok(BodyKind::Multipart(reader))
            }
            None => Ok(BodyKind::Opaque),
        }
    }

    fn read_body<S: Stream>(&mut self, stream: &mut S, body_start: usize) -> Result<(), Error> {
        let Some(length) = self.content_length()? else {
            return Ok(());
        };
        if length == 0 {
            return Ok(());
        }

        self.state = State::ReadingBody;
        match self.body_kind()? {
            BodyKind::Multipart(mut reader) => self.read_multipart(stream, body_start, length, &mut reader),
            kind => {
                let end = match body_start.checked_add(length) {
                    Some(end) if end <= self.config.max_request_len => end,
                    _ => {
                        warn!("body of {} bytes exceeds the request limit", length);
                        self.buffer.release();
                        return Err(Error::ResourceExhausted);
                    }
                };

                let started = self.host.millis();
                while self.buffer.len() < end {
                    self.fill(stream, started, u64::from(self.config.body_timeout_ms))?;
                }
                // anything past the declared length is ignored
                let body = Span::between(body_start, end);

                if let BodyKind::Form = kind {
                    self.params
                        .tokenize(self.buffer.as_mut_slice(), body, false)?;
                } else {
                    self.body = Some(body);
                }
                Ok(())
            }
        }
    }

    fn read_multipart<S: Stream>(
        &mut self,
        stream: &mut S,
        body_start: usize,
        length: usize,
        reader: &mut MultipartReader,
    ) -> Result<(), Error> {
        let prefetched = self.buffer.split_off(body_start);
        let path = self.line.path(self.buffer.as_slice());
        let uploads = self
            .matched
            .filter(|index| self.handlers[*index].can_upload(path));

        let mut source = StreamSource::new(
            prefetched,
            length,
            stream,
            &mut self.host,
            u64::from(self.config.upload_timeout_ms),
        );
        let mut sink = FormCollector {
            buffer: &mut self.buffer,
            params: &mut self.params,
            headers: &self.headers,
            line: &self.line,
            handler: match uploads {
                Some(index) => self.handlers.get_mut(index),
                None => None,
            },
            field: None,
        };

        reader.run(&mut source, &mut sink)
    }

    fn dispatch(&mut self) -> Outcome {
        self.state = State::Dispatched;
        let request = Request::new(
            self.buffer.as_slice(),
            &self.headers,
            &self.params,
            &self.line,
            self.body,
            None,
        );

        let handled = match self.matched {
            Some(index) => match self.handlers.get_mut(index) {
                Some(handler) => handler.handle(&request),
                None => false,
            },
            None => false,
        };
        if handled {
            return Outcome::Handled;
        }

        if let Some(not_found) = self.not_found.as_mut() {
            not_found(&request);
        }
        Outcome::NotFound
    }
}

/// Discard whatever the client sent past the parsed request.
fn drain<S: Stream>(stream: &mut S) {
    let mut scratch = [0u8; 64];
    while stream.available() > 0 {
        match stream.read(&mut scratch) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
    }
}

/// Collects multipart text fields into the request buffer and forwards
/// upload events to the matched handler.
struct FormCollector<'a> {
    buffer: &'a mut RequestBuffer,
    params: &'a mut ParamTable,
    headers: &'a HeaderTable,
    line: &'a RequestLine,
    handler: Option<&'a mut Box<dyn Handler>>,
    field: Option<(Span, usize)>,
}

impl FormSink for FormCollector<'_> {
    fn begin_field(&mut self, name: &str) -> Result<(), Error> {
        let key = self.buffer.append(name.as_bytes())?;
        self.field = Some((key, self.buffer.len()));
        Ok(())
    }

    fn field_data(&mut self, data: &[u8]) -> Result<(), Error> {
        self.buffer.append(data)?;
        Ok(())
    }

    fn end_field(&mut self) -> Result<(), Error> {
        if let Some((key, start)) = self.field.take() {
            let value = Span::between(start, self.buffer.len());
            self.params.append(key, Some(value))?;
        }
        Ok(())
    }

    fn upload(&mut self, upload: &Upload) {
        let Some(handler) = self.handler.as_mut() else {
            return;
        };
        let request = Request::new(
            self.buffer.as_slice(),
            self.headers,
            self.params,
            self.line,
            None,
            Some(upload),
        );
        handler.upload(&request, request.path(), upload);
    }
}
