use crate::error::ConfirmError;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Mount state of whatever hosts a confirmation flow. Once unmounted, flows
/// stop at their next suspension point and publish nothing further.
#[derive(Clone, Default)]
pub struct Lifecycle {
    unmounted: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unmount(&self) {
        self.unmounted.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_unmounted(&self) -> bool {
        self.unmounted.load(Ordering::SeqCst)
    }

    /// Resolves once `unmount` has been called.
    pub async fn unmounted(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_unmounted() {
                return;
            }
            notified.await;
        }
    }

    /// Runs one external call, racing it against unmount. A response that
    /// lands after unmount is discarded.
    pub async fn scoped<T, F>(&self, call: F) -> Result<T, ConfirmError>
    where
        F: Future<Output = Result<T, ConfirmError>>,
    {
        tokio::select! {
            biased;
            _ = self.unmounted() => Err(ConfirmError::Unmounted),
            out = call => {
                if self.is_unmounted() {
                    Err(ConfirmError::Unmounted)
                } else {
                    out
                }
            }
        }
    }

    /// Unmounts when the returned guard is dropped, e.g. when a request
    /// handler future is dropped on client disconnect.
    pub fn guard(&self) -> MountGuard {
        MountGuard {
            lifecycle: self.clone(),
        }
    }
}

pub struct MountGuard {
    lifecycle: Lifecycle,
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        self.lifecycle.unmount();
    }
}
