//! Idle connection pool.
//!
//! Per-destination cache of open, unused connections. The map is keyed by
//! [`Address`]; each entry is its own mutex-guarded stack, so contention is
//! scoped to one destination and no lock is ever held across I/O.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};

use crate::client::address::Address;

type IdleStack = Arc<Mutex<Vec<TcpStream>>>;

/// Address-keyed LIFO pool of idle connections.
///
/// Invariant: a connection is either in at most one stack here or owned by
/// exactly one in-flight request, never both.
#[derive(Default)]
pub struct ConnectionPool {
    entries: RwLock<HashMap<Address, IdleStack>>,
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Pop the most-recently-returned connection for `addr`, if any.
    ///
    /// LIFO order favors warm, recently validated connections. The caller
    /// probes the result with [`is_reusable`] and discards dead ones.
    pub async fn checkout(&self, addr: &Address) -> Option<TcpStream> {
        let stack = self.entries.read().await.get(addr).cloned()?;
        let mut stack = stack.lock().await;
        stack.pop()
    }

    /// Return a connection to the front of `addr`'s idle list.
    pub async fn checkin(&self, addr: &Address, stream: TcpStream) {
        let stack = {
            let entries = self.entries.read().await;
            entries.get(addr).cloned()
        };
        let stack = match stack {
            Some(s) => s,
            None => {
                let mut entries = self.entries.write().await;
                entries
                    .entry(addr.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
                    .clone()
            }
        };
        stack.lock().await.push(stream);
        tracing::trace!(addr = %addr, "connection returned to pool");
    }

    /// Number of idle connections currently pooled for `addr`.
    pub async fn idle_count(&self, addr: &Address) -> usize {
        match self.entries.read().await.get(addr) {
            Some(stack) => stack.lock().await.len(),
            None => 0,
        }
    }
}

/// Probe a pooled connection for liveness without blocking.
///
/// A clean EOF means the peer closed it while idle; readable stray bytes
/// mean its state is unknown. Either way it must not be reused.
pub(crate) fn is_reusable(stream: &TcpStream) -> bool {
    let mut probe = [0u8; 1];
    match stream.try_read(&mut probe) {
        Ok(0) => false,
        Ok(_) => false,
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => true,
        Err(_) => false,
    }
}
