//! HTTP/1.x protocol implementation.
//!
//! This module implements the HTTP message model and an incremental parser
//! shared by the request and response paths.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`headers`**: Case-insensitive, ordered header map with derived
//!   attributes (content length, chunked detection)
//! - **`request`**: Request start line, builder, and serialization
//! - **`response`**: Response start line and parsed response
//! - **`parser`**: The incremental message parser
//!
//! # Parser State Machine
//!
//! Each message moves through a state machine, driven by whatever bytes
//! have arrived so far:
//!
//! ```text
//!        ┌──────────────┐
//!        │  StartLine   │ ← buffer until the first CRLF
//!        └──────┬───────┘
//!               │ 3 tokens parsed
//!               ▼
//!        ┌──────────────┐
//!        │   Headers    │ ← rows until the empty line
//!        └──────┬───────┘
//!               │ body mode selected once
//!               ▼
//!        ┌─────────────────────────────────┐
//!        │ Body(FixedLength | Chunked |    │
//!        │      UntilClose)                │
//!        └──────┬──────────────────────────┘
//!               │ Finished
//!               ├─ trailing bytes → StartLine (pipelining)
//!               └─ error → Failed (connection discarded)
//! ```

pub mod headers;
pub mod parser;
pub mod request;
pub mod response;

/// HTTP protocol version.
///
/// Only HTTP/1.0 and HTTP/1.1 exist on this engine's wire; any other
/// version token is a parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "HTTP/1.0" => Some(Version::Http10),
            "HTTP/1.1" => Some(Version::Http11),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}
