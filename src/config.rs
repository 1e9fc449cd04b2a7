//! Request engine configuration.
//!
//! Devices usually keep their settings as a small JSON document in flash;
//! [`Config::from_json`] loads one with `serde-json-core`, and any field the
//! document leaves out keeps its default.
//!
//! ```rust
//! use libiot_httpd::config::Config;
//!
//! let config = Config::from_json(br#"{"header_timeout_ms":2000}"#).unwrap();
//! assert_eq!(config.header_timeout_ms, 2000);
//! assert_eq!(config.body_timeout_ms, Config::default().body_timeout_ms);
//! ```

use serde::{Deserialize, Serialize};

/// Milliseconds to wait for the client to send the request head.
pub const DEFAULT_HEADER_TIMEOUT_MS: u32 = 5000;
/// Milliseconds to wait for a `Content-Length` body to arrive.
pub const DEFAULT_BODY_TIMEOUT_MS: u32 = 5000;
/// Milliseconds a multipart stream may stay idle between two bytes.
pub const DEFAULT_UPLOAD_TIMEOUT_MS: u32 = 5000;
/// Largest request (head plus buffered body) the engine will hold.
pub const DEFAULT_MAX_REQUEST_LEN: usize = 16 * 1024;

/// Tunables for one [`Server`](crate::network::application::http::server::Server).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deadline for the header phase, measured from its first poll.
    pub header_timeout_ms: u32,
    /// Deadline for the body phase, measured from its first poll.
    pub body_timeout_ms: u32,
    /// Idle deadline between two multipart bytes.
    pub upload_timeout_ms: u32,
    /// Ceiling for the request buffer. Growing past it fails the same way
    /// an allocation failure does.
    pub max_request_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            header_timeout_ms: DEFAULT_HEADER_TIMEOUT_MS,
            body_timeout_ms: DEFAULT_BODY_TIMEOUT_MS,
            upload_timeout_ms: DEFAULT_UPLOAD_TIMEOUT_MS,
            max_request_len: DEFAULT_MAX_REQUEST_LEN,
        }
    }
}

/// Errors raised while loading a [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The document is not valid JSON for this structure.
    Invalid,
    /// A limit is zero.
    OutOfRange,
}

impl Config {
    /// Parse a configuration document.
    pub fn from_json(json: &[u8]) -> Result<Self, ConfigError> {
        let (config, _): (Config, usize) =
            serde_json_core::from_slice(json).map_err(|_| ConfigError::Invalid)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize into `buf`, returning the number of bytes written.
    pub fn to_json(&self, buf: &mut [u8]) -> Result<usize, ConfigError> {
        serde_json_core::to_slice(self, buf).map_err(|_| ConfigError::Invalid)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let timeouts = [self.header_timeout_ms, self.body_timeout_ms, self.upload_timeout_ms];
        if timeouts.contains(&0) || self.max_request_len == 0 {
            return Err(ConfigError::OutOfRange);
        }
        Ok(())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ConfigError::Invalid => defmt::write!(f, "Invalid"),
            ConfigError::OutOfRange => defmt::write!(f, "OutOfRange"),
        }
    }
}
