//! courier - HTTP/1.x and WebSocket protocol engine with a pooled,
//! asynchronous client dispatcher.

pub mod bytequeue;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod ws;

pub use client::address::Address;
pub use client::dispatcher::HttpClient;
pub use config::ClientConfig;
pub use error::Error;
