//! Crate-level error taxonomy.
//!
//! Parser-internal failures ([`ParseError`]) never cross a component
//! boundary as panics; the dispatcher maps them onto this type and resolves
//! the owning request's completion handle with it. A failure on one
//! connection never affects another.

use std::io;

use crate::http::parser::ParseError;

/// Errors surfaced by the client dispatcher and the WebSocket client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The peer sent a malformed message.
    #[error("parse error: {0}")]
    Parse(ParseError),

    /// Headers or body exceeded a configured cap.
    #[error("message too large: {size} bytes (limit: {limit})")]
    Oversized { size: u64, limit: u64 },

    /// The stream closed before the declared body was complete.
    #[error("incomplete body")]
    IncompleteBody,

    /// The request deadline passed before a response completed.
    #[error("timeout")]
    Timeout,

    /// The WebSocket upgrade was refused or failed validation.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// An invalid URL was supplied.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// I/O error from the transport.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The connection closed before a response completed.
    #[error("connection closed before response complete")]
    ConnectionClosed,

    /// The dispatcher was stopped before this request ran.
    #[error("dispatcher stopped")]
    Stopped,
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::IncompleteBody | ParseError::IncompleteChunkedBody => {
                Error::IncompleteBody
            }
            ParseError::HeadersTooLarge { size, limit } => Error::Oversized {
                size: size as u64,
                limit: limit as u64,
            },
            other => Error::Parse(other),
        }
    }
}
