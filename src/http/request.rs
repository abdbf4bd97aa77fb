use bytes::Bytes;

use crate::http::Version;
use crate::http::headers::HeaderMap;

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// # Example
    ///
    /// ```
    /// # use courier::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            "PATCH" => Some(Method::PATCH),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
        }
    }
}

/// Immutable request start line.
///
/// Holds method, path, optional query string, and HTTP version, plus the
/// serialized start-line bytes computed once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    method: Method,
    path: String,
    query: Option<String>,
    version: Version,
    start_line: Bytes,
}

impl RequestHead {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        query: Option<String>,
        version: Version,
    ) -> Self {
        let path = path.into();
        let mut line = Vec::with_capacity(32);
        line.extend_from_slice(method.as_str().as_bytes());
        line.push(b' ');
        line.extend_from_slice(path.as_bytes());
        if let Some(q) = &query {
            line.push(b'?');
            line.extend_from_slice(q.as_bytes());
        }
        line.push(b' ');
        line.extend_from_slice(version.as_str().as_bytes());
        line.extend_from_slice(b"\r\n");

        Self {
            method,
            path,
            query,
            version,
            start_line: Bytes::from(line),
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Request target: path plus `?query` when present.
    pub fn target(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }

    /// Cached serialized start line, including the trailing CRLF.
    pub fn start_line(&self) -> &[u8] {
        &self.start_line
    }
}

/// Request entity body.
///
/// The dispatcher buffers request bodies whole; response bodies are still
/// parsed incrementally on the read path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Bytes),
}

impl Body {
    pub fn len(&self) -> usize {
        match self {
            Body::Empty => 0,
            Body::Bytes(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Empty => &[],
            Body::Bytes(b) => b,
        }
    }
}

/// A complete HTTP request: start line, headers, and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub head: RequestHead,
    pub headers: HeaderMap,
    pub body: Body,
}

impl Request {
    pub fn builder(method: Method, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(method, path)
    }

    pub fn get(path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(Method::DELETE, path)
    }

    /// Serialize the full request: start line, headers, separator, body.
    ///
    /// A `Content-Length` header is added automatically when a body is
    /// present and none was set explicitly.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256 + self.body.len());
        buf.extend_from_slice(self.head.start_line());

        self.headers.encode_into(&mut buf);
        if !self.body.is_empty() && !self.headers.contains("Content-Length") {
            buf.extend_from_slice(b"Content-Length: ");
            buf.extend_from_slice(self.body.len().to_string().as_bytes());
            buf.extend_from_slice(b"\r\n");
        }

        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(self.body.as_bytes());
        buf
    }
}

/// Builder for constructing [`Request`] objects.
pub struct RequestBuilder {
    method: Method,
    path: String,
    query: Option<String>,
    version: Version,
    headers: HeaderMap,
    body: Body,
}

impl RequestBuilder {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        // A path given as "/search?q=rust" splits into path and query.
        let raw = path.into();
        let (path, query) = match raw.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (raw, None),
        };

        Self {
            method,
            path,
            query,
            version: Version::Http11,
            headers: HeaderMap::new(),
            body: Body::Empty,
        }
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Body::Bytes(body.into());
        self
    }

    pub fn build(self) -> Request {
        let head = RequestHead::new(self.method, self.path, self.query, self.version);
        Request {
            head,
            headers: self.headers,
            body: self.body,
        }
    }
}
