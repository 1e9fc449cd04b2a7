//! Request method vocabulary.

/// HTTP request methods recognized by the server.
///
/// `Any` doubles as the wildcard in handler filters and as the
/// classification of a request whose method token is outside the
/// vocabulary; such requests still parse, they just only reach handlers
/// registered for `Any`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Any,
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    /// Classify a method token. Matching is case-sensitive.
    pub fn from_token(token: &[u8]) -> Self {
        match token {
            b"GET" => Method::Get,
            b"POST" => Method::Post,
            b"PUT" => Method::Put,
            b"PATCH" => Method::Patch,
            b"DELETE" => Method::Delete,
            b"OPTIONS" => Method::Options,
            _ => Method::Any,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Any => "ANY",
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }

    /// Whether a handler filtering on `self` accepts a request made with `method`.
    pub fn accepts(&self, method: Method) -> bool {
        *self == Method::Any || *self == method
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Method {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str())
    }
}
