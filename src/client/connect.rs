//! Transport factory.
//!
//! The dispatcher never opens sockets itself; it asks a [`Connect`]
//! implementation handed to it at construction. Tests substitute their own
//! connector; TLS-capable deployments wrap one around their session layer,
//! since TLS establishment lives outside this crate.

use std::future::Future;
use std::io;
use std::pin::Pin;

use tokio::net::TcpStream;

use crate::client::address::Address;

pub type ConnectFuture = Pin<Box<dyn Future<Output = io::Result<TcpStream>> + Send>>;

/// Opens a transport connection to an [`Address`].
pub trait Connect: Send + Sync {
    fn connect(&self, addr: &Address) -> ConnectFuture;
}

/// Plain-TCP connector.
///
/// Refuses secure addresses: establishing TLS is the caller's collaborator,
/// supplied as its own [`Connect`] implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connect for TcpConnector {
    fn connect(&self, addr: &Address) -> ConnectFuture {
        let addr = addr.clone();
        Box::pin(async move {
            if addr.secure {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "secure address requires a TLS-capable connector",
                ));
            }
            TcpStream::connect((addr.host.as_str(), addr.port)).await
        })
    }
}
