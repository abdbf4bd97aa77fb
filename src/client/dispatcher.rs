//! Request dispatcher.
//!
//! Turns many concurrent logical requests into a bounded number of real
//! connections. Requests are admitted from a FIFO queue while fewer than
//! `max_concurrent` are in flight; each admitted request acquires a
//! connection (pooled or fresh), writes itself, and drives a
//! [`MessageParser`] over the bytes the transport delivers. The parser's
//! completion or error decides whether the connection goes back to the
//! pool.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout, timeout_at};

use crate::client::address::Address;
use crate::client::completion::{CompletionCell, CompletionHandle};
use crate::client::connect::{Connect, TcpConnector};
use crate::client::pool::{self, ConnectionPool};
use crate::config::ClientConfig;
use crate::error::Error;
use crate::http::headers::HeaderMap;
use crate::http::parser::{MessageHead, MessageParser, ParserEvent};
use crate::http::request::Request;
use crate::http::response::{Response, ResponseHead};

/// Connection-pooled HTTP/1.x client.
///
/// Cloning is cheap; clones share the pool, queue, and in-flight budget.
///
/// # Example
///
/// ```ignore
/// let client = HttpClient::new(ClientConfig::default());
/// let request = Request::get("/status").header("Host", "example.com").build();
/// let addr = Address::new("example.com", 80, false);
/// let response = client.request(request, addr, Duration::from_secs(5)).await?;
/// assert_eq!(response.status(), 200);
/// ```
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    connector: Box<dyn Connect>,
    pool: ConnectionPool,
    state: Mutex<DispatchState>,
}

struct DispatchState {
    queue: VecDeque<PendingRequest>,
    in_flight: usize,
    stopped: bool,
}

/// A submitted request waiting for, or undergoing, dispatch.
struct PendingRequest {
    request: Request,
    address: Address,
    timeout: Duration,
    cell: CompletionCell,
}

impl HttpClient {
    /// Client with the default plain-TCP connector.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(config, TcpConnector)
    }

    /// Client with a caller-supplied transport factory (TLS, tests).
    pub fn with_connector(config: ClientConfig, connector: impl Connect + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                connector: Box::new(connector),
                pool: ConnectionPool::new(),
                state: Mutex::new(DispatchState {
                    queue: VecDeque::new(),
                    in_flight: 0,
                    stopped: false,
                }),
            }),
        }
    }

    /// Enqueue a request and return immediately.
    ///
    /// The handle resolves exactly once with the parsed response or a typed
    /// failure. Must be called from within a tokio runtime.
    pub fn submit(
        &self,
        request: Request,
        address: Address,
        timeout: Duration,
    ) -> CompletionHandle {
        let (cell, handle) = CompletionCell::channel();
        let pending = PendingRequest {
            request,
            address,
            timeout,
            cell,
        };

        {
            let mut state = lock_state(&self.inner.state);
            if state.stopped {
                pending.cell.resolve(Err(Error::Stopped));
                return handle;
            }
            state.queue.push_back(pending);
        }
        Inner::drain(&self.inner);
        handle
    }

    /// Submit and wait.
    pub async fn request(
        &self,
        request: Request,
        address: Address,
        timeout: Duration,
    ) -> Result<Response, Error> {
        self.submit(request, address, timeout).wait().await
    }

    /// Stop admitting work.
    ///
    /// Queued requests fail with [`Error::Stopped`] without running;
    /// requests already in flight run to completion.
    pub fn stop(&self) {
        let drained: Vec<PendingRequest> = {
            let mut state = lock_state(&self.inner.state);
            state.stopped = true;
            state.queue.drain(..).collect()
        };
        let dropped = drained.len();
        for pending in drained {
            pending.cell.resolve(Err(Error::Stopped));
        }
        if dropped > 0 {
            tracing::debug!(dropped, "dispatcher stopped with queued requests");
        }
    }

    /// Idle pooled connections for an address (observability/tests).
    pub async fn idle_connections(&self, addr: &Address) -> usize {
        self.inner.pool.idle_count(addr).await
    }
}

fn lock_state(state: &Mutex<DispatchState>) -> std::sync::MutexGuard<'_, DispatchState> {
    // The lock is only ever held for queue/counter updates; a poisoned
    // state still has a consistent queue, so continue with it.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Inner {
    /// Admit queued requests while in-flight slots are free.
    ///
    /// Invoked after every terminal outcome as well as on submission: the
    /// drain-after-completion step is what keeps the queue moving and is a
    /// correctness contract of the dispatcher.
    fn drain(inner: &Arc<Inner>) {
        loop {
            let pending = {
                let mut state = lock_state(&inner.state);
                if state.in_flight >= inner.config.max_concurrent {
                    return;
                }
                match state.queue.pop_front() {
                    Some(p) => {
                        state.in_flight += 1;
                        p
                    }
                    None => return,
                }
            };

            let inner = Arc::clone(inner);
            tokio::spawn(async move {
                tracing::debug!(
                    addr = %pending.address,
                    method = pending.request.head.method().as_str(),
                    target = %pending.request.head.target(),
                    "dispatching request"
                );

                let outcome = inner.execute(&pending).await;
                match &outcome {
                    Ok(response) => {
                        tracing::debug!(
                            addr = %pending.address,
                            status = response.status(),
                            "request completed"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(addr = %pending.address, error = %e, "request failed");
                    }
                }
                pending.cell.resolve(outcome);

                {
                    let mut state = lock_state(&inner.state);
                    state.in_flight -= 1;
                }
                Inner::drain(&inner);
            });
        }
    }

    async fn execute(&self, pending: &PendingRequest) -> Result<Response, Error> {
        let mut stream = self.acquire(&pending.address).await?;

        let bytes = pending.request.encode();
        stream.write_all(&bytes).await?;
        stream.flush().await?;

        // The timeout window opens at write time, not at submission.
        let deadline = Instant::now() + pending.timeout;
        match timeout_at(deadline, self.read_response(&mut stream)).await {
            Ok(Ok((response, reusable))) => {
                if reusable && response.keep_alive() {
                    self.pool.checkin(&pending.address, stream).await;
                }
                Ok(response)
            }
            Ok(Err(e)) => Err(e),
            // The connection's state is unknown after a timeout: dropping
            // the stream closes it rather than pooling it.
            Err(_) => Err(Error::Timeout),
        }
    }

    /// Pop pooled connections until a live one turns up, else dial.
    async fn acquire(&self, addr: &Address) -> Result<TcpStream, Error> {
        while let Some(stream) = self.pool.checkout(addr).await {
            if pool::is_reusable(&stream) {
                tracing::trace!(addr = %addr, "reusing pooled connection");
                return Ok(stream);
            }
            tracing::debug!(addr = %addr, "discarding dead pooled connection");
        }

        let stream = timeout(self.config.connect_timeout(), self.connector.connect(addr))
            .await
            .map_err(|_| Error::Timeout)??;
        tracing::trace!(addr = %addr, "opened new connection");
        Ok(stream)
    }

    /// Read and parse one response.
    ///
    /// Returns the response and whether the connection is still clean
    /// enough to pool (message finished on a live stream with no trailing
    /// bytes).
    async fn read_response(&self, stream: &mut TcpStream) -> Result<(Response, bool), Error> {
        let mut parser = MessageParser::response(self.config.parser_limits());
        let mut head: Option<(ResponseHead, HeaderMap)> = None;
        let mut body = BytesMut::new();
        let mut buf = [0u8; 8192];

        loop {
            let n = stream.read(&mut buf).await?;
            let events = if n == 0 {
                parser.connection_closed()?
            } else {
                parser.feed(&buf[..n])?
            };

            let mut finished = false;
            for event in events {
                match event {
                    ParserEvent::Headers {
                        head: MessageHead::Response(h),
                        headers,
                    } => {
                        if let Some(declared) = headers.content_length() {
                            let limit = self.config.max_body_size as u64;
                            if declared > limit {
                                return Err(Error::Oversized {
                                    size: declared,
                                    limit,
                                });
                            }
                        }
                        head = Some((h, headers));
                    }
                    // A response-role parser only produces response heads.
                    ParserEvent::Headers { .. } => unreachable!(),
                    ParserEvent::BodyChunk(chunk) => {
                        let size = body.len() + chunk.len();
                        if size > self.config.max_body_size {
                            return Err(Error::Oversized {
                                size: size as u64,
                                limit: self.config.max_body_size as u64,
                            });
                        }
                        body.extend_from_slice(&chunk);
                    }
                    ParserEvent::Finished => {
                        finished = true;
                    }
                }
                if finished {
                    break;
                }
            }

            if finished {
                let (h, headers) = match head {
                    Some(parts) => parts,
                    None => return Err(Error::ConnectionClosed),
                };
                let reusable = n != 0 && parser.buffered() == 0;
                return Ok((Response::new(h, headers, body.freeze()), reusable));
            }
            if n == 0 {
                // Closed without completing a message head.
                return Err(Error::ConnectionClosed);
            }
        }
    }
}
