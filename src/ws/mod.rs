//! WebSocket protocol implementation (RFC 6455).
//!
//! Three layers, composed rather than entangled:
//!
//! - **`frame`**: stateless frame codec — header probing, length
//!   encoding, masking
//! - **`handshake`**: `Sec-WebSocket-Key`/`Sec-WebSocket-Accept`
//!   derivation and validation
//! - **`client`**: the handshake client, which runs the HTTP upgrade
//!   through the shared message parser and then hands the byte stream to
//!   the frame codec
//!
//! # Connection State Machine
//!
//! ```text
//!  NotConnected → UpgradeSent → ValidatingResponse → Connected
//!                                                       │
//!                                     close sent/recv   ▼
//!                                                    Closing → Closed
//! ```
//!
//! The first three states live inside [`client::WsClient::connect`]; a
//! constructed client is always at least `Connected`.

pub mod client;
pub mod frame;
pub mod handshake;
