//! The pieces of the host contract a source calls into: result queues and the
//! cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

/// Where a source pushes its results. Pushing never fails from the source's
/// point of view; a sink that cannot accept an item drops it.
pub trait ResultSink<T>: Send + Sync {
    fn put(&self, item: T);
}

impl<T: Send> ResultSink<T> for Mutex<Vec<T>> {
    fn put(&self, item: T) {
        match self.lock() {
            Ok(mut queue) => queue.push(item),
            Err(poisoned) => poisoned.into_inner().push(item),
        }
    }
}

impl<T: Send> ResultSink<T> for UnboundedSender<T> {
    fn put(&self, item: T) {
        if self.send(item).is_err() {
            warn!("result receiver dropped, discarding item");
        }
    }
}

/// Host-owned cancellation flag. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
