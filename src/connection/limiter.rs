//! Connection Limiter

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// Optional cap on concurrently open connections
#[derive(Debug, Clone)]
pub struct ConnectionLimiter {
    semaphore: Option<Arc<Semaphore>>,
    max_connections: Option<usize>,
}

impl ConnectionLimiter {
    /// `None` means unbounded
    pub fn new(max_connections: Option<usize>) -> Self {
        Self {
            semaphore: max_connections.map(|max| Arc::new(Semaphore::new(max))),
            max_connections,
        }
    }

    /// Try to acquire a connection slot; `None` when the limit is reached
    pub fn try_acquire(&self) -> Option<ConnectionSlot> {
        let Some(semaphore) = &self.semaphore else {
            return Some(ConnectionSlot { _permit: None });
        };

        match Arc::clone(semaphore).try_acquire_owned() {
            Ok(permit) => {
                debug!(
                    available = semaphore.available_permits(),
                    "Acquired connection slot"
                );
                Some(ConnectionSlot {
                    _permit: Some(permit),
                })
            }
            Err(_) => {
                warn!(
                    max_connections = ?self.max_connections,
                    "Connection limit reached, rejecting upgrade"
                );
                None
            }
        }
    }
}

/// Connection slot that automatically releases when dropped
pub struct ConnectionSlot {
    _permit: Option<OwnedSemaphorePermit>,
}
