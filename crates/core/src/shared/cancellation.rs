use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Listener = Box<dyn Fn() + Send + Sync>;

/// Returned by [`CancellationToken::check`] once cancellation was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("execution cancelled")]
pub struct Cancelled;

/// Cooperative cancellation shared between a caller and every pipeline stage.
///
/// Stages call [`check`](Self::check) at entry and after each network or
/// media round trip. Long-running external calls can register an abort
/// listener with [`on_cancel`](Self::on_cancel); the returned guard
/// deregisters it when dropped.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    next_listener_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

impl Inner {
    /// The flag is only set while this lock is held, so registration and
    /// cancellation cannot interleave.
    fn listeners(&self) -> MutexGuard<'_, Vec<(u64, Listener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let listeners = self.inner.listeners();
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        for (_, listener) in listeners.iter() {
            listener();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Registers `listener` to run on cancellation. Runs it immediately if
    /// the token is already cancelled.
    pub fn on_cancel<F>(&self, listener: F) -> CancelListenerGuard
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let mut listeners = self.inner.listeners();
        if self.is_cancelled() {
            drop(listeners);
            listener();
        } else {
            listeners.push((id, Box::new(listener)));
        }
        CancelListenerGuard {
            inner: Arc::clone(&self.inner),
            id,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners().len()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Deregisters its abort listener on drop.
pub struct CancelListenerGuard {
    inner: Arc<Inner>,
    id: u64,
}

impl Drop for CancelListenerGuard {
    fn drop(&mut self) {
        self.inner.listeners().retain(|(id, _)| *id != self.id);
    }
}
