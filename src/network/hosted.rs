//! Transport and host adapters for targets with the standard library.
//!
//! These let the same engine that runs on a microcontroller serve a real
//! socket on a development machine or a Linux-based device.

extern crate std;

use super::{Close, Connection, Host, Read, Stream, Write};
use std::io::{self, ErrorKind, Read as StdRead, Write as StdWrite};
use std::net::{Shutdown, TcpStream};
use std::time::Instant;

/// Size of the peek window used to estimate available bytes.
const PEEK_WINDOW: usize = 1460;

/// A [`Host`] backed by `std::time::Instant` and `std::thread::yield_now`.
#[derive(Debug, Clone, Copy)]
pub struct StdHost {
    epoch: Instant,
}

impl StdHost {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for StdHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for StdHost {
    fn millis(&mut self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn yield_now(&mut self) {
        std::thread::yield_now();
    }
}

/// An accepted TCP client switched to non-blocking mode.
#[derive(Debug)]
pub struct TcpClient {
    stream: TcpStream,
}

impl TcpClient {
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }

    fn peek(&self) -> io::Result<usize> {
        let mut window = [0u8; PEEK_WINDOW];
        self.stream.peek(&mut window)
    }
}

impl Read for TcpClient {
    type Error = io::Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self.stream.read(buf) {
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(0),
            other => other,
        }
    }
}

impl Write for TcpClient {
    type Error = io::Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        loop {
            match self.stream.write(buf) {
                Err(e) if e.kind() == ErrorKind::WouldBlock => std::thread::yield_now(),
                other => return other,
            }
        }
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.stream.flush()
    }
}

impl Close for TcpClient {
    type Error = io::Error;

    /// Shut down both directions of the socket and drop it.
    fn close(self) -> Result<(), Self::Error> {
        self.stream.shutdown(Shutdown::Both)
    }
}

impl Connection for TcpClient {}

impl Stream for TcpClient {
    fn available(&mut self) -> usize {
        self.peek().unwrap_or(0)
    }

    fn connected(&mut self) -> bool {
        match self.peek() {
            Ok(0) => false,
            Ok(_) => true,
            Err(e) => e.kind() == ErrorKind::WouldBlock,
        }
    }
}
