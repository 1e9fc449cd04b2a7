//! # libiot-httpd - embedded HTTP request engine
//!
//! A small HTTP/1.1 server core for IoT devices that serve a local web
//! interface or REST endpoints from a microcontroller. It reads one request
//! at a time from an accepted client, parses it into a compact tokenized
//! form and dispatches it to a registered handler. This library is designed
//! for embedded systems and supports `no_std` environments with an
//! allocator.
//!
//! ## Features
//!
//! - Request line, header and query string parsing into a single buffer
//! - `application/x-www-form-urlencoded` bodies merged with query arguments
//! - Streaming `multipart/form-data` uploads in fixed-size chunks
//! - Per-phase timeouts and a configurable request size ceiling
//! - HTTP Basic credential checks
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! libiot-httpd = "0.1.0"
//! ```
//!
//! ### Serving a request
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
//! server.on("/api/status", Method::Get, |request| {
//!     request.header("Accept").is_some()
//! });
//! server.on_not_found(|_| false);
//!
//! let mut client = Client;
//! let status = server.handle_client(&mut client).status_code();
//! # let _ = status;
//! ```
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, Xtensa) with a global allocator
//! - Linux-based IoT devices, through the `std` adapters
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support and the TCP adapters (default: disabled)
//! - `defmt`: Enable defmt logging support for embedded debugging

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

extern crate alloc;

#[macro_use]
mod fmt;

/// Engine configuration and its JSON loader.
pub mod config;

/// Network abstraction layer and the HTTP request engine built on it.
///
/// The transport traits live at the top of this module; the engine itself
/// is under [`network::application::http`].
pub mod network;
