//! A network abstraction layer for embedded HTTP serving
//!
//! This module provides the small set of traits the request engine consumes
//! from the platform: a byte stream for the accepted client, and a host
//! that supplies a monotonic clock plus a cooperative yield. Anything that
//! implements them (a smoltcp socket, a vendor WiFi client, an in-memory
//! mock) can feed the server.
//!

#![allow(missing_docs)]
#![deny(unsafe_code)]

/// Protocol implementations built on top of the transport traits
pub mod application;

/// Adapters for hosted targets
#[cfg(feature = "std")]
pub mod hosted;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Close, Connection, Host, Read, Stream, Write};
}

// Core synchronous traits
pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read data from the connection
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous connection
pub trait Connection: Read + Write + Close {}

/// An accepted client byte stream with unpredictable arrival timing.
///
/// `available` must never block: it reports how many bytes a following
/// [`Read::read`] can return right now, which may be zero. `connected`
/// reports whether the peer is still there; a stream that is disconnected
/// but still has buffered bytes should keep returning them from `read`.
pub trait Stream: Read + Write {
    /// Number of bytes that can be read without waiting
    fn available(&mut self) -> usize;
    /// Whether the peer is still connected
    fn connected(&mut self) -> bool;
}

/// Services the engine needs from the host while it polls for bytes.
pub trait Host {
    /// Milliseconds from an arbitrary, monotonic epoch
    fn millis(&mut self) -> u64;
    /// Give unrelated cooperative tasks a chance to run
    fn yield_now(&mut self);
}
