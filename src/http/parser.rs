//! Incremental HTTP/1.x message parser shared by the request and response
//! paths.
//!
//! The parser consumes bytes through a [`ByteQueue`] and reports progress
//! as [`ParserEvent`]s returned from [`MessageParser::feed`]. Exactly one
//! parser instance is active per physical connection at a time; after a
//! message completes, the parser resets itself so trailing bytes from a
//! pipelined peer are parsed as the next message.

use bytes::Bytes;

use crate::bytequeue::ByteQueue;
use crate::http::Version;
use crate::http::headers::HeaderMap;
use crate::http::request::{Method, RequestHead};
use crate::http::response::ResponseHead;

/// Parse failures.
///
/// Once a parser reports one of these it stops emitting events; the owning
/// connection is expected to be discarded, not reused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("malformed start line: {0}")]
    InvalidStartLine(String),

    #[error("unsupported HTTP version: {0}")]
    UnsupportedVersion(String),

    #[error("malformed header row")]
    InvalidHeader,

    #[error("header line too large ({size} bytes, limit {limit})")]
    LineTooLong { size: usize, limit: usize },

    #[error("header block too large ({size} bytes, limit {limit})")]
    HeadersTooLarge { size: usize, limit: usize },

    #[error("problem reading chunk size")]
    InvalidChunkSize,

    #[error("incomplete chunked body")]
    IncompleteChunkedBody,

    #[error("incomplete body")]
    IncompleteBody,
}

/// Size caps enforced while a message head is being buffered.
#[derive(Debug, Clone, Copy)]
pub struct ParserLimits {
    /// Maximum length of a single start line or header row.
    pub max_line: usize,
    /// Maximum total size of the header block.
    pub max_headers: usize,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            max_line: 8 * 1024,
            max_headers: 64 * 1024,
        }
    }
}

/// Parsed start line of either message kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageHead {
    Request(RequestHead),
    Response(ResponseHead),
}

/// Progress reported by [`MessageParser::feed`].
#[derive(Debug, Clone)]
pub enum ParserEvent {
    /// Start line and header block are complete.
    Headers {
        head: MessageHead,
        headers: HeaderMap,
    },
    /// A slice of body bytes, in arrival order.
    BodyChunk(Bytes),
    /// The message is complete; the parser has reset for the next one.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Request,
    Response,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyMode {
    FixedLength(u64),
    /// `Some(n)` when a chunk size line has been read and `n` payload
    /// bytes (plus CRLF) are still expected; `Some(0)` while waiting for
    /// the terminal CRLF; `None` between chunks.
    Chunked(Option<u64>),
    UntilClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StartLine,
    Headers,
    Body(BodyMode),
    Failed,
}

/// Incremental parser for one HTTP/1.x message stream.
pub struct MessageParser {
    role: Role,
    limits: ParserLimits,
    queue: ByteQueue,
    state: State,
    pending_head: Option<MessageHead>,
    pending_headers: HeaderMap,
    header_bytes: usize,
}

impl MessageParser {
    /// Parser for incoming requests (server side of an exchange).
    pub fn request(limits: ParserLimits) -> Self {
        Self::new(Role::Request, limits)
    }

    /// Parser for incoming responses (client side of an exchange).
    pub fn response(limits: ParserLimits) -> Self {
        Self::new(Role::Response, limits)
    }

    fn new(role: Role, limits: ParserLimits) -> Self {
        Self {
            role,
            limits,
            queue: ByteQueue::new(),
            state: State::StartLine,
            pending_head: None,
            pending_headers: HeaderMap::new(),
            header_bytes: 0,
        }
    }

    /// Feed bytes from the transport and collect the resulting events.
    ///
    /// After a [`ParseError`] the parser is poisoned: further calls return
    /// no events.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<ParserEvent>, ParseError> {
        if self.state == State::Failed {
            return Ok(Vec::new());
        }
        self.queue.append(bytes);
        self.drive()
    }

    /// Signal end-of-stream.
    ///
    /// Close terminates an `UntilClose` body and an idle chunked body
    /// cleanly; anything else mid-message is an error. With no message in
    /// progress this is a no-op.
    pub fn connection_closed(&mut self) -> Result<Vec<ParserEvent>, ParseError> {
        match self.state {
            State::Failed => Ok(Vec::new()),
            State::StartLine | State::Headers => {
                // Nothing buffered: clean idle close. Otherwise the head
                // was cut short; the caller decides how to report it.
                self.state = State::Failed;
                Ok(Vec::new())
            }
            State::Body(BodyMode::FixedLength(_)) => {
                self.state = State::Failed;
                Err(ParseError::IncompleteBody)
            }
            State::Body(BodyMode::Chunked(pending)) => match pending {
                None | Some(0) => {
                    self.reset();
                    Ok(vec![ParserEvent::Finished])
                }
                Some(_) => {
                    self.state = State::Failed;
                    Err(ParseError::IncompleteChunkedBody)
                }
            },
            State::Body(BodyMode::UntilClose) => {
                let mut events = Vec::new();
                if !self.queue.is_empty() {
                    events.push(ParserEvent::BodyChunk(self.queue.take_all()));
                }
                events.push(ParserEvent::Finished);
                self.reset();
                Ok(events)
            }
        }
    }

    /// Remove and return any bytes buffered beyond the last parsed message.
    ///
    /// Used by the WebSocket client to recover frame bytes that arrived in
    /// the same read as the tail of the upgrade response.
    pub fn take_remaining(&mut self) -> Bytes {
        self.queue.take_all()
    }

    /// Bytes buffered but not yet consumed by a parsed message.
    pub fn buffered(&self) -> usize {
        self.queue.remaining()
    }

    fn reset(&mut self) {
        self.state = State::StartLine;
        self.pending_head = None;
        self.pending_headers = HeaderMap::new();
        self.header_bytes = 0;
    }

    fn fail(&mut self, err: ParseError) -> ParseError {
        self.state = State::Failed;
        err
    }

    fn drive(&mut self) -> Result<Vec<ParserEvent>, ParseError> {
        let mut events = Vec::new();
        loop {
            let step = match self.state {
                State::StartLine => self.step_start_line(),
                State::Headers => self.step_headers(&mut events),
                State::Body(mode) => self.step_body(mode, &mut events),
                State::Failed => Ok(false),
            };
            match step {
                Ok(true) => continue,
                Ok(false) => break,
                Err(e) => return Err(self.fail(e)),
            }
        }
        Ok(events)
    }

    /// Pull one CRLF-terminated line off the queue, enforcing `max_line`.
    ///
    /// `Ok(None)` means the terminator has not arrived yet.
    fn next_line(&mut self) -> Result<Option<String>, ParseError> {
        match self.queue.find(b"\r\n") {
            Some(pos) => {
                if pos > self.limits.max_line {
                    return Err(ParseError::LineTooLong {
                        size: pos,
                        limit: self.limits.max_line,
                    });
                }
                let raw = self.queue.pull(pos);
                self.queue.discard(2);
                match std::str::from_utf8(&raw) {
                    Ok(s) => Ok(Some(s.to_string())),
                    Err(_) => Err(ParseError::InvalidHeader),
                }
            }
            None => {
                if self.queue.remaining() > self.limits.max_line {
                    return Err(ParseError::LineTooLong {
                        size: self.queue.remaining(),
                        limit: self.limits.max_line,
                    });
                }
                Ok(None)
            }
        }
    }

    fn step_start_line(&mut self) -> Result<bool, ParseError> {
        let line = match self.queue.find(b"\r\n") {
            Some(pos) => {
                if pos > self.limits.max_line {
                    return Err(ParseError::LineTooLong {
                        size: pos,
                        limit: self.limits.max_line,
                    });
                }
                let raw = self.queue.pull(pos);
                self.queue.discard(2);
                std::str::from_utf8(&raw)
                    .map_err(|_| ParseError::InvalidStartLine("not valid UTF-8".into()))?
                    .to_string()
            }
            None => {
                if self.queue.remaining() > self.limits.max_line {
                    return Err(ParseError::LineTooLong {
                        size: self.queue.remaining(),
                        limit: self.limits.max_line,
                    });
                }
                return Ok(false);
            }
        };

        let head = self.parse_start_line(&line)?;
        self.pending_head = Some(head);
        self.pending_headers = HeaderMap::new();
        self.header_bytes = 0;
        self.state = State::Headers;
        Ok(true)
    }

    fn parse_start_line(&self, line: &str) -> Result<MessageHead, ParseError> {
        // Exactly three space-separated tokens; the third may itself
        // contain spaces (response reason phrases).
        let mut parts = line.splitn(3, ' ');
        let (Some(first), Some(second), Some(third)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseError::InvalidStartLine(line.to_string()));
        };
        if first.is_empty() || second.is_empty() {
            return Err(ParseError::InvalidStartLine(line.to_string()));
        }

        match self.role {
            Role::Request => {
                let method = Method::from_str(first)
                    .ok_or_else(|| ParseError::InvalidStartLine(line.to_string()))?;
                let version = Version::from_str(third)
                    .ok_or_else(|| ParseError::UnsupportedVersion(third.to_string()))?;
                let (path, query) = match second.split_once('?') {
                    Some((p, q)) => (p.to_string(), Some(q.to_string())),
                    None => (second.to_string(), None),
                };
                Ok(MessageHead::Request(RequestHead::new(
                    method, path, query, version,
                )))
            }
            Role::Response => {
                let version = Version::from_str(first)
                    .ok_or_else(|| ParseError::UnsupportedVersion(first.to_string()))?;
                let status: u16 = second
                    .parse()
                    .map_err(|_| ParseError::InvalidStartLine(line.to_string()))?;
                Ok(MessageHead::Response(ResponseHead::new(
                    version, status, third,
                )))
            }
        }
    }

    fn step_headers(&mut self, events: &mut Vec<ParserEvent>) -> Result<bool, ParseError> {
        loop {
            let line = match self.next_line()? {
                Some(line) => line,
                None => return Ok(false),
            };
            self.header_bytes += line.len() + 2;
            if self.header_bytes > self.limits.max_headers {
                return Err(ParseError::HeadersTooLarge {
                    size: self.header_bytes,
                    limit: self.limits.max_headers,
                });
            }

            if line.is_empty() {
                // End of the header block.
                return self.finish_headers(events);
            }

            let (name, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;
            let name = name.trim();
            if name.is_empty() {
                return Err(ParseError::InvalidHeader);
            }
            self.pending_headers.insert(name, value.trim());
        }
    }

    /// Select the body mode. Evaluated once, right after the header block.
    fn finish_headers(&mut self, events: &mut Vec<ParserEvent>) -> Result<bool, ParseError> {
        let head = match self.pending_head.take() {
            Some(h) => h,
            None => return Err(ParseError::InvalidHeader),
        };
        let headers = std::mem::take(&mut self.pending_headers);

        let mode = if headers.is_chunked() {
            Some(BodyMode::Chunked(None))
        } else if let Some(len) = headers.content_length() {
            if len == 0 { None } else { Some(BodyMode::FixedLength(len)) }
        } else {
            match self.role {
                // Requests without a declared length carry no body.
                Role::Request => None,
                Role::Response => Some(BodyMode::UntilClose),
            }
        };

        events.push(ParserEvent::Headers { head, headers });
        match mode {
            Some(mode) => {
                self.state = State::Body(mode);
            }
            None => {
                events.push(ParserEvent::Finished);
                self.reset();
            }
        }
        Ok(true)
    }

    fn step_body(&mut self, mode: BodyMode, events: &mut Vec<ParserEvent>) -> Result<bool, ParseError> {
        match mode {
            BodyMode::FixedLength(remaining) => {
                if self.queue.is_empty() {
                    return Ok(false);
                }
                let take = remaining.min(self.queue.remaining() as u64) as usize;
                events.push(ParserEvent::BodyChunk(self.queue.pull(take)));
                let remaining = remaining - take as u64;
                if remaining == 0 {
                    events.push(ParserEvent::Finished);
                    // Bytes past the declared length stay queued; they
                    // belong to the next pipelined message.
                    self.reset();
                } else {
                    self.state = State::Body(BodyMode::FixedLength(remaining));
                }
                Ok(true)
            }
            BodyMode::Chunked(None) => self.step_chunk_size(),
            BodyMode::Chunked(Some(0)) => {
                // Terminal 0-size chunk: consume its closing CRLF.
                if self.queue.remaining() < 2 {
                    return Ok(false);
                }
                if self.queue.peek(2) != b"\r\n" {
                    return Err(ParseError::InvalidChunkSize);
                }
                self.queue.discard(2);
                events.push(ParserEvent::Finished);
                self.reset();
                Ok(true)
            }
            BodyMode::Chunked(Some(size)) => {
                // Payload plus its trailing CRLF must be available in full.
                let needed = size as usize + 2;
                if self.queue.remaining() < needed {
                    return Ok(false);
                }
                events.push(ParserEvent::BodyChunk(self.queue.pull(size as usize)));
                if self.queue.peek(2) != b"\r\n" {
                    return Err(ParseError::InvalidChunkSize);
                }
                self.queue.discard(2);
                self.state = State::Body(BodyMode::Chunked(None));
                Ok(true)
            }
            BodyMode::UntilClose => {
                if self.queue.is_empty() {
                    return Ok(false);
                }
                events.push(ParserEvent::BodyChunk(self.queue.take_all()));
                Ok(true)
            }
        }
    }

    fn step_chunk_size(&mut self) -> Result<bool, ParseError> {
        let pos = match self.queue.find(b"\r\n") {
            Some(pos) => pos,
            None => {
                if self.queue.remaining() > self.limits.max_line {
                    return Err(ParseError::InvalidChunkSize);
                }
                return Ok(false);
            }
        };
        // A CRLF with no hex digits before it is a malformed chunk, not a
        // separator to skip.
        if pos == 0 {
            return Err(ParseError::InvalidChunkSize);
        }

        let raw = self.queue.pull(pos);
        self.queue.discard(2);
        let line = std::str::from_utf8(&raw).map_err(|_| ParseError::InvalidChunkSize)?;

        // Chunk extensions (";name=value") are ignored.
        let digits = line
            .split(|c| c == ';' || c == ' ')
            .next()
            .unwrap_or("")
            .trim();
        if digits.is_empty() {
            return Err(ParseError::InvalidChunkSize);
        }
        let size = u64::from_str_radix(digits, 16).map_err(|_| ParseError::InvalidChunkSize)?;

        self.state = State::Body(BodyMode::Chunked(Some(size)));
        Ok(true)
    }
}
