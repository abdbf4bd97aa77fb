//! Single-assignment request completion.
//!
//! Every submitted request gets one [`CompletionCell`]/[`CompletionHandle`]
//! pair. The cell resolves exactly once: timeout resolution can race
//! network-driven resolution, and the first writer wins while later
//! attempts are no-ops.

use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::error::Error;
use crate::http::response::Response;

/// Resolution side, owned by the dispatcher.
pub struct CompletionCell {
    tx: Mutex<Option<oneshot::Sender<Result<Response, Error>>>>,
}

/// Waiting side, returned to the submitter.
pub struct CompletionHandle {
    rx: oneshot::Receiver<Result<Response, Error>>,
}

impl CompletionCell {
    pub fn channel() -> (CompletionCell, CompletionHandle) {
        let (tx, rx) = oneshot::channel();
        (
            CompletionCell {
                tx: Mutex::new(Some(tx)),
            },
            CompletionHandle { rx },
        )
    }

    /// Resolve the request. Returns `true` if this call won the race;
    /// later calls are no-ops.
    pub fn resolve(&self, result: Result<Response, Error>) -> bool {
        let sender = self.tx.lock().map(|mut slot| slot.take()).unwrap_or(None);
        match sender {
            // A dropped handle makes send fail; the resolution still
            // counts as done.
            Some(tx) => {
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.tx.lock().map(|slot| slot.is_none()).unwrap_or(true)
    }
}

impl CompletionHandle {
    /// Wait for the request to resolve.
    pub async fn wait(self) -> Result<Response, Error> {
        match self.rx.await {
            Ok(result) => result,
            // The cell was dropped without resolving; only dispatcher
            // shutdown does that.
            Err(_) => Err(Error::Stopped),
        }
    }
}
