//! Read-only view of the request being handled.

use super::buffer::Span;
use super::error::Error;
use super::headers::HeaderTable;
use super::multipart::Upload;
use super::params::ParamTable;
use crate::network::application::http::method::Method;
use base64ct::{Base64, Encoding as B64Encoding};

/// Longest decoded `user:password` pair accepted by [`Request::authenticate`].
const MAX_CREDENTIALS_LEN: usize = 128;

/// The three parts of the request line, as spans into the request buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestLine {
    pub(crate) method: Method,
    method_token: Span,
    path: Span,
    query: Option<Span>,
    version: Span,
}

impl RequestLine {
    /// Split the request line `line` of `buffer` into method, path, query
    /// and version.
    ///
    /// The first space ends the method and the second ends the path; a third
    /// space makes the line malformed. A `?` inside the path starts the
    /// query. The line must be valid UTF-8 with a non-empty method and
    /// version.
    pub fn parse(buffer: &[u8], line: Span) -> Result<Self, Error> {
        let bytes = line.get(buffer).ok_or(Error::MalformedRequest)?;
        if core::str::from_utf8(bytes).is_err() {
            return Err(Error::MalformedRequest);
        }

        let mut method_end = None;
        let mut path_end = None;
        let mut question = None;

        for (pos, byte) in bytes.iter().enumerate() {
            match byte {
                b' ' if method_end.is_none() => method_end = Some(pos),
                b' ' if path_end.is_none() => path_end = Some(pos),
                b' ' => return Err(Error::MalformedRequest),
                b'?' if method_end.is_some() && path_end.is_none() && question.is_none() => {
                    question = Some(pos)
                }
                _ => {}
            }
        }

        let (Some(method_end), Some(path_end)) = (method_end, path_end) else {
            return Err(Error::MalformedRequest);
        };
        if method_end == 0 || path_end + 1 == bytes.len() {
            return Err(Error::MalformedRequest);
        }

        let base = line.start();
        let token = Span::new(base, method_end);
        let method_bytes = token.get(buffer).ok_or(Error::MalformedRequest)?;

        Ok(Self {
            method: Method::from_token(method_bytes),
            method_token: token,
            path: Span::between(base + method_end + 1, base + question.unwrap_or(path_end)),
            query: question.map(|question| Span::between(base + question + 1, base + path_end)),
            version: Span::between(base + path_end + 1, line.end()),
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn query(&self) -> Option<Span> {
        self.query
    }

    pub(crate) fn path<'b>(&self, buffer: &'b [u8]) -> &'b str {
        text(buffer, self.path).unwrap_or("")
    }
}

/// What a handler sees of the request: request line, headers, merged
/// parameters, the raw body if one was kept, and the upload in flight.
///
/// Every accessor borrows from the server that produced the view, so no
/// token can outlive the buffer it points into.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    buffer: &'a [u8],
    headers: &'a HeaderTable,
    params: &'a ParamTable,
    line: &'a RequestLine,
    body: Option<Span>,
    upload: Option<&'a Upload>,
}

impl<'a> Request<'a> {
    pub(crate) fn new(
        buffer: &'a [u8],
        headers: &'a HeaderTable,
        params: &'a ParamTable,
        line: &'a RequestLine,
        body: Option<Span>,
        upload: Option<&'a Upload>,
    ) -> Self {
        Self {
            buffer,
            headers,
            params,
            line,
            body,
            upload,
        }
    }

    pub fn method(&self) -> Method {
        self.line.method
    }

    /// The method token as sent, useful when [`Request::method`] is `Any`.
    pub fn method_str(&self) -> &'a str {
        text(self.buffer, self.line.method_token).unwrap_or("")
    }

    /// Request path without the query string.
    pub fn path(&self) -> &'a str {
        self.line.path(self.buffer)
    }

    pub fn uri(&self) -> &'a str {
        self.path()
    }

    /// Protocol version token, e.g. `HTTP/1.1`.
    pub fn version(&self) -> &'a str {
        text(self.buffer, self.line.version).unwrap_or("")
    }

    /// Number of parameters from the query string and the form body.
    pub fn args(&self) -> usize {
        self.params.total()
    }

    /// First parameter named `name`, if its value is valid UTF-8.
    pub fn arg(&self, name: &str) -> Option<&'a str> {
        self.arg_bytes(name)
            .and_then(|value| core::str::from_utf8(value).ok())
    }

    pub fn arg_bytes(&self, name: &str) -> Option<&'a [u8]> {
        self.params.value(self.buffer, name.as_bytes())
    }

    pub fn arg_at(&self, index: usize) -> Option<&'a str> {
        self.params
            .value_at(self.buffer, index)
            .and_then(|value| core::str::from_utf8(value).ok())
    }

    pub fn arg_name(&self, index: usize) -> Option<&'a str> {
        self.params
            .key(self.buffer, index)
            .and_then(|key| core::str::from_utf8(key).ok())
    }

    /// True if `name` was sent, with or without a value.
    pub fn has_arg(&self, name: &str) -> bool {
        self.params.has(self.buffer, name.as_bytes())
    }

    /// Number of header lines, not counting the request line.
    pub fn headers(&self) -> usize {
        self.headers.total().saturating_sub(1)
    }

    /// First header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.headers
            .value(self.buffer, name)
            .and_then(|value| core::str::from_utf8(value).ok())
    }

    pub fn header_at(&self, index: usize) -> Option<&'a str> {
        self.headers
            .value_at(self.buffer, index + 1)
            .and_then(|value| core::str::from_utf8(value).ok())
    }

    pub fn header_name(&self, index: usize) -> Option<&'a str> {
        self.headers
            .key(self.buffer, index + 1)
            .and_then(|key| core::str::from_utf8(key).ok())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.has(self.buffer, name)
    }

    pub fn host_header(&self) -> Option<&'a str> {
        self.header("Host")
    }

    /// Declared body length, if the header is present and numeric.
    pub fn content_length(&self) -> Option<usize> {
        self.header("Content-Length")?.trim().parse().ok()
    }

    /// The body, for requests whose body was neither a form nor multipart.
    pub fn body(&self) -> Option<&'a [u8]> {
        self.body?.get(self.buffer)
    }

    /// The upload in flight, only set during upload callbacks.
    pub fn upload(&self) -> Option<&'a Upload> {
        self.upload
    }

    /// Check HTTP Basic credentials from the `Authorization` header.
    ///
    /// # Example
    ///
    /// A request carrying `Authorization: Basic YWRtaW46c2VjcmV0` passes
    /// `request.authenticate("admin", "secret")` and fails for any other
    /// pair.
    pub fn authenticate(&self, username: &str, password: &str) -> bool {
        let Some(value) = self.header("Authorization") else {
            return false;
        };
        let Some(scheme) = value.get(..6) else {
            return false;
        };
        if !scheme.eq_ignore_ascii_case("Basic ") {
            return false;
        }

        let mut decoded_buffer = [0u8; MAX_CREDENTIALS_LEN];
        let Ok(decoded) = Base64::decode(value[6..].trim().as_bytes(), &mut decoded_buffer) else {
            warn!("bad basic credentials encoding");
            return false;
        };

        let user = username.as_bytes();
        decoded.len() == user.len() + 1 + password.len()
            && decoded.starts_with(user)
            && decoded[user.len()] == b':'
            && &decoded[user.len() + 1..] == password.as_bytes()
    }
}

fn text(buffer: &[u8], span: Span) -> Option<&str> {
    span.get(buffer)
        .and_then(|bytes| core::str::from_utf8(bytes).ok())
}
