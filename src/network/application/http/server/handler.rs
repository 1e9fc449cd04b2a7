//! Request handlers and the URI filter they are registered under.

use super::multipart::Upload;
use super::request::Request;
use crate::network::application::http::method::Method;
use alloc::boxed::Box;
use alloc::string::String;

/// Callback run for a fully parsed request. Returns whether it handled it.
pub type HandlerFn = Box<dyn FnMut(&Request<'_>) -> bool>;
/// Callback run for every upload status change and full chunk.
pub type UploadFn = Box<dyn FnMut(&Request<'_>, &Upload)>;

/// Something the server can dispatch requests to.
///
/// The server asks every registered handler in order and picks the first
/// whose [`can_handle`](Handler::can_handle) is true. The pick happens as
/// soon as the request line is known, so the same handler also receives
/// the upload callbacks of a multipart body.
pub trait Handler {
    /// Whether this handler serves `method` requests for `path`.
    fn can_handle(&self, method: Method, path: &str) -> bool;

    /// Whether this handler wants file uploads posted to `path`.
    fn can_upload(&self, _path: &str) -> bool {
        false
    }

    /// Serve the request. Returning false falls through to the not-found handler.
    fn handle(&mut self, request: &Request<'_>) -> bool;

    /// Receive one upload event for a request to `path`.
    fn upload(&mut self, _request: &Request<'_>, _path: &str, _upload: &Upload) {}
}

/// Path filter: an exact path, or a prefix when registered with a trailing `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Uri {
    Exact(String),
    Prefix(String),
}

impl Uri {
    pub fn new(pattern: &str) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) => Uri::Prefix(prefix.into()),
            None => Uri::Exact(pattern.into()),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Uri::Exact(exact) => exact == path,
            Uri::Prefix(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}

/// A [`Handler`] made of closures.
pub struct FunctionHandler {
    uri: Uri,
    method: Method,
    handler: HandlerFn,
    upload: Option<UploadFn>,
}

impl FunctionHandler {
    pub fn new(uri: &str, method: Method, handler: impl FnMut(&Request<'_>) -> bool + 'static) -> Self {
        Self {
            uri: Uri::new(uri),
            method,
            handler: Box::new(handler),
            upload: None,
        }
    }

    /// Also accept file uploads, passing every event to `upload`.
    pub fn with_upload(mut self, upload: impl FnMut(&Request<'_>, &Upload) + 'static) -> Self {
        self.upload = Some(Box::new(upload));
        self
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }
}

impl core::fmt::Debug for FunctionHandler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FunctionHandler")
            .field("uri", &self.uri)
            .field("method", &self.method)
            .field("uploads", &self.upload.is_some())
            .finish()
    }
}

impl Handler for FunctionHandler {
    fn can_handle(&self, method: Method, path: &str) -> bool {
        self.method.accepts(method) && self.uri.matches(path)
    }

    fn can_upload(&self, path: &str) -> bool {
        self.upload.is_some() && self.uri.matches(path)
    }

    fn handle(&mut self, request: &Request<'_>) -> bool {
        (self.handler)(request)
    }

    fn upload(&mut self, request: &Request<'_>, _path: &str, upload: &Upload) {
        if let Some(callback) = self.upload.as_mut() {
            callback(request, upload);
        }
    }
}
