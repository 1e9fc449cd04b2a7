//! HTTP/1.1 server for embedded systems.
//!
//! This module provides a request engine designed for devices that serve a
//! handful of endpoints to one client at a time. It focuses on bounded
//! memory use and on tolerating clients that trickle bytes in slowly.
//!
//! # Features
//!
//! - One growable buffer per request, tokens are offsets into it
//! - Case-insensitive header lookup, first occurrence wins
//! - Query string and url-encoded form arguments in one list
//! - Streaming multipart uploads in 2 KiB chunks with a running CRC-32
//! - Exact or prefix (`/static/*`) path matching
//!
//! # Usage
//!
//! The main entry point is the [`Server`] which reads from any client type
//! implementing [`Stream`](crate::network::Stream).

/// Request methods.
pub mod method;

/// The request engine and its parsers.
///
/// Contains the [`Server`](server::Server) struct, the request view handed
/// to handlers and the building blocks they are made of.
pub mod server;

pub use method::Method;
pub use server::error::Error;
pub use server::handler::{FunctionHandler, Handler, Uri};
pub use server::multipart::{Upload, UploadStatus};
pub use server::request::Request;
pub use server::{Outcome, Server, State};
