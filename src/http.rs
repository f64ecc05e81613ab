use std::collections::BTreeMap;
use std::error::Error;

/// Headers consulted, in order, when resolving the client address behind proxies.
const CLIENT_IP_HEADERS: [&str; 5] = [
    "X-Forwarded-For",
    "Proxy-Client-IP",
    "WL-Proxy-Client-IP",
    "HTTP_CLIENT_IP",
    "HTTP_X_FORWARDED_FOR",
];

/// What the HTTP layer knows about an inbound request.
///
/// The crate does not parse HTTP; the integration layer fills this in.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub method: String,
    pub uri: String,
    pub query: Option<String>,
    pub remote_addr: String,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl RequestInfo {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = addr.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Best guess at the originating client address.
    ///
    /// Walks the usual proxy headers and falls back to the socket address.
    /// For `X-Forwarded-For` only the first hop is kept.
    pub fn client_ip(&self) -> String {
        for name in CLIENT_IP_HEADERS {
            if let Some(value) = self.header(name) {
                let first = value.split(',').next().unwrap_or("").trim();
                if !first.is_empty() && !first.eq_ignore_ascii_case("unknown") {
                    return first.to_string();
                }
            }
        }
        self.remote_addr.clone()
    }
}

/// What the HTTP layer knows about the response.
#[derive(Debug, Clone, Default)]
pub struct ResponseInfo {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ResponseInfo {
    pub fn new(status: u16) -> Self {
        Self { status, body: Vec::new() }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// Description of a failure raised while serving a request.
#[derive(Debug, Clone, Default)]
pub struct ErrorInfo {
    pub type_name: String,
    pub message: String,
    pub stack: Option<String>,
}

impl ErrorInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Build from any error, using its `source()` chain as the stack text.
    pub fn from_error<E: Error + ?Sized>(err: &E) -> Self {
        let mut chain = String::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push_str("caused by: ");
            chain.push_str(&cause.to_string());
            chain.push('\n');
            source = cause.source();
        }

        Self {
            type_name: std::any::type_name::<E>().to_string(),
            message: err.to_string(),
            stack: if chain.is_empty() { None } else { Some(chain) },
        }
    }
}
