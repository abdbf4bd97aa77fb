use bytes::Bytes;

use crate::http::Version;
use crate::http::headers::HeaderMap;

/// Immutable response status line.
///
/// The status code is kept as the raw `u16` from the wire so no status
/// information is lost; the reason phrase is carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    version: Version,
    status: u16,
    reason: String,
    start_line: Bytes,
}

impl ResponseHead {
    pub fn new(version: Version, status: u16, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let mut line = Vec::with_capacity(32);
        line.extend_from_slice(version.as_str().as_bytes());
        line.push(b' ');
        line.extend_from_slice(status.to_string().as_bytes());
        line.push(b' ');
        line.extend_from_slice(reason.as_bytes());
        line.extend_from_slice(b"\r\n");

        Self {
            version,
            status,
            reason,
            start_line: Bytes::from(line),
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Cached serialized status line, including the trailing CRLF.
    pub fn start_line(&self) -> &[u8] {
        &self.start_line
    }
}

/// A complete parsed HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    head: ResponseHead,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    pub(crate) fn new(head: ResponseHead, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            head,
            headers,
            body,
        }
    }

    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    pub fn status(&self) -> u16 {
        self.head.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Retrieves a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Response body decoded as UTF-8, with invalid sequences replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Determines whether the connection may be reused after this response.
    ///
    /// For HTTP/1.1 the default is `true` unless `Connection: close` is
    /// present. For HTTP/1.0 the default is `false` unless
    /// `Connection: keep-alive` is present.
    pub fn keep_alive(&self) -> bool {
        match self.headers.get("Connection") {
            Some(v) if v.eq_ignore_ascii_case("close") => false,
            Some(v) if v.eq_ignore_ascii_case("keep-alive") => true,
            _ => self.head.version == Version::Http11,
        }
    }
}
