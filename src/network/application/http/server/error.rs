//! Failure kinds of the request parsing phase

use core::fmt;

/// Why a request could not be parsed and dispatched.
///
/// Every variant maps onto a status code through [`Error::status_code`]; the
/// response layer turns that into a status-line-only reply.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// No bytes arrived before the phase deadline.
    Timeout,
    /// The request buffer could not grow. The partial buffer has already
    /// been released.
    ResourceExhausted,
    /// The request line or header block is structurally invalid.
    MalformedRequest,
    /// The client went away while a file upload was being streamed.
    UploadAborted,
    /// The client went away outside of a file upload.
    ConnectionClosed,
}

impl Error {
    /// Status code reported to the client for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Timeout => 408,
            Error::ResourceExhausted => 413,
            Error::MalformedRequest | Error::UploadAborted | Error::ConnectionClosed => 400,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Error::Timeout => "request timed out",
            Error::ResourceExhausted => "request too large",
            Error::MalformedRequest => "malformed request",
            Error::UploadAborted => "upload aborted",
            Error::ConnectionClosed => "connection closed",
        };
        f.write_str(text)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::ResourceExhausted => defmt::write!(f, "ResourceExhausted"),
            Error::MalformedRequest => defmt::write!(f, "MalformedRequest"),
            Error::UploadAborted => defmt::write!(f, "UploadAborted"),
            Error::ConnectionClosed => defmt::write!(f, "ConnectionClosed"),
        }
    }
}
