//! WebSocket handshake client.
//!
//! Composition, not new parsing: the HTTP parser handles the single
//! upgrade exchange, then the frame codec takes over the byte stream.

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::bytequeue::ByteQueue;
use crate::client::address::Address;
use crate::client::connect::{Connect, TcpConnector};
use crate::error::Error;
use crate::http::parser::{MessageHead, MessageParser, ParserEvent, ParserLimits};
use crate::http::request::Request;
use crate::ws::frame::{self, opcode};
use crate::ws::handshake;

/// Default cap on a single incoming frame payload (16 MiB).
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WsState {
    Connected,
    Closing,
    Closed,
}

/// One received frame, unmasked.
///
/// Control frames the client handles itself (ping, pong) are not
/// surfaced; close frames are. Unrecognized opcodes pass through
/// uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsMessage {
    pub fin: bool,
    pub opcode: u8,
    pub payload: Bytes,
}

/// A client-side WebSocket connection.
///
/// Created by [`WsClient::connect`], which performs the HTTP upgrade and
/// validates the `Sec-WebSocket-Accept` answer before any frame moves.
#[derive(Debug)]
pub struct WsClient {
    stream: TcpStream,
    queue: ByteQueue,
    state: WsState,
    max_payload: usize,
}

impl WsClient {
    /// Connect and upgrade using the default plain-TCP connector.
    pub async fn connect(addr: &Address, path: &str) -> Result<Self, Error> {
        Self::connect_via(&TcpConnector, addr, path).await
    }

    /// Connect and upgrade through a caller-supplied transport factory.
    pub async fn connect_via(
        connector: &dyn Connect,
        addr: &Address,
        path: &str,
    ) -> Result<Self, Error> {
        let mut stream = connector.connect(addr).await?;

        let key = handshake::generate_key();
        let request = Request::get(path)
            .header("Host", addr.host_header())
            .header("Upgrade", "websocket")
            .header("Connection", "Upgrade")
            .header("Sec-WebSocket-Version", "13")
            .header("Sec-WebSocket-Key", key.clone())
            .build();

        stream.write_all(&request.encode()).await?;
        stream.flush().await?;
        tracing::debug!(addr = %addr, path, "websocket upgrade sent");

        // Parse just the upgrade response head; bytes past it are the
        // first frames and land in the frame queue.
        let mut parser = MessageParser::response(ParserLimits::default());
        let mut queue = ByteQueue::new();
        let mut buf = [0u8; 4096];

        let (head, headers) = loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                return Err(Error::Handshake(
                    "connection closed during upgrade".to_string(),
                ));
            }

            let events = parser.feed(&buf[..n])?;
            let mut parsed = None;
            for event in events {
                match event {
                    ParserEvent::Headers {
                        head: MessageHead::Response(head),
                        headers,
                    } => parsed = Some((head, headers)),
                    ParserEvent::BodyChunk(chunk) => queue.append(&chunk),
                    _ => {}
                }
            }
            if let Some(parts) = parsed {
                break parts;
            }
        };

        if head.status() != 101 {
            // Failing the handshake closes the transport: `stream` drops
            // here.
            return Err(Error::Handshake(format!(
                "expected 101 Switching Protocols, got {} {}",
                head.status(),
                head.reason()
            )));
        }

        let accept = headers
            .get("Sec-WebSocket-Accept")
            .ok_or_else(|| Error::Handshake("missing Sec-WebSocket-Accept header".to_string()))?;
        if !handshake::validate_accept(&key, accept) {
            return Err(Error::Handshake(format!(
                "Sec-WebSocket-Accept mismatch: expected {}, got {}",
                handshake::accept_key(&key),
                accept
            )));
        }

        queue.append(&parser.take_remaining());
        tracing::debug!(addr = %addr, "websocket connected");

        Ok(Self {
            stream,
            queue,
            state: WsState::Connected,
            max_payload: DEFAULT_MAX_PAYLOAD,
        })
    }

    /// Cap on a single incoming frame payload.
    pub fn set_max_payload(&mut self, max: usize) {
        self.max_payload = max;
    }

    pub async fn send_text(&mut self, text: &str) -> Result<(), Error> {
        self.send(opcode::TEXT, text.as_bytes()).await
    }

    pub async fn send_binary(&mut self, data: &[u8]) -> Result<(), Error> {
        self.send(opcode::BINARY, data).await
    }

    /// Send one frame. Client frames are always masked with a fresh key.
    pub async fn send(&mut self, opcode: u8, payload: &[u8]) -> Result<(), Error> {
        if self.state == WsState::Closed {
            return Err(Error::ConnectionClosed);
        }

        let key = frame::random_mask_key();
        let header = frame::build_frame_header(payload.len() as u64, true, opcode, Some(key));
        let mut masked = payload.to_vec();
        frame::apply_mask(&mut masked, key);

        self.stream.write_all(&header).await?;
        self.stream.write_all(&masked).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Receive the next data or close frame.
    ///
    /// Pings are answered with pongs transparently; pongs are swallowed.
    pub async fn receive(&mut self) -> Result<WsMessage, Error> {
        loop {
            if let Some(msg) = self.next_frame()? {
                match msg.opcode {
                    opcode::PING => {
                        self.send(opcode::PONG, &msg.payload).await?;
                        continue;
                    }
                    opcode::PONG => continue,
                    opcode::CLOSE => {
                        self.state = match self.state {
                            WsState::Closing => WsState::Closed,
                            _ => WsState::Closing,
                        };
                        return Ok(msg);
                    }
                    _ => return Ok(msg),
                }
            }

            let mut buf = [0u8; 4096];
            let n = self.stream.read(&mut buf).await?;
            if n == 0 {
                self.state = WsState::Closed;
                return Err(Error::ConnectionClosed);
            }
            self.queue.append(&buf[..n]);
        }
    }

    /// Try to extract one complete frame from the queue.
    fn next_frame(&mut self) -> Result<Option<WsMessage>, Error> {
        let header = match frame::parse_frame_header(self.queue.peek(14)) {
            Some(h) => h,
            None => return Ok(None),
        };
        if header.payload_len > self.max_payload as u64 {
            return Err(Error::Oversized {
                size: header.payload_len,
                limit: self.max_payload as u64,
            });
        }

        let total = header.header_len + header.payload_len as usize;
        if self.queue.remaining() < total {
            return Ok(None);
        }

        self.queue.discard(header.header_len);
        let payload = if let Some(key) = header.mask_key {
            let mut unmasked = self.queue.pull(header.payload_len as usize).to_vec();
            frame::apply_mask(&mut unmasked, key);
            Bytes::from(unmasked)
        } else {
            self.queue.pull(header.payload_len as usize)
        };

        Ok(Some(WsMessage {
            fin: header.fin,
            opcode: header.opcode,
            payload,
        }))
    }

    /// Initiate the closing handshake and wait for the peer's close frame.
    pub async fn close(&mut self) -> Result<(), Error> {
        if self.state == WsState::Closed {
            return Ok(());
        }

        if self.state == WsState::Connected {
            self.send(opcode::CLOSE, &[]).await?;
            self.state = WsState::Closing;
        }

        loop {
            match self.receive().await {
                Ok(msg) if msg.opcode == opcode::CLOSE => break,
                Ok(_) => continue,
                Err(Error::ConnectionClosed) => break,
                Err(e) => return Err(e),
            }
        }

        self.state = WsState::Closed;
        self.stream.shutdown().await.ok();
        Ok(())
    }
}
