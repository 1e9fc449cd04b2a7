//! # Application Layer Network Protocols
//!
//! Protocol implementations that sit on top of the transport traits in
//! [`crate::network`]. They never touch sockets directly, so the same code
//! runs over a vendor WiFi stack, smoltcp or an in-memory test stream.
//!
//! ## Available Protocols
//!
//! - **[`http`]**: HTTP/1.1 request engine for serving clients
//!
//! ## Design Principles
//!
//! - **Transport Agnostic**: Work with any type implementing [`Stream`](crate::network::Stream)
//! - **No-std Compatible**: Only `core` and `alloc` are required
//! - **Bounded Memory**: Every buffer has a configured or fixed ceiling

/// HTTP server implementation.
///
/// Parses requests from an accepted client and dispatches them to
/// registered handlers.
pub mod http;
