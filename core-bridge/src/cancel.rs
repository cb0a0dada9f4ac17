//! Cancellation handles returned by asynchronous producers.
//!
//! A [`Cancellable`] is the capability to request early termination of an
//! in-flight operation. Requests are best-effort and idempotent: calling
//! [`Cancellable::cancel`] twice, or after the producer has already finished,
//! does nothing.

use std::sync::{Arc, Mutex, PoisonError};

/// Handle used to request cancellation of an in-flight producer.
pub trait Cancellable: Send + Sync {
    fn cancel(&self);
}

/// For producers with nothing to cancel.
impl Cancellable for () {
    fn cancel(&self) {}
}

impl Cancellable for tokio_util::sync::CancellationToken {
    fn cancel(&self) {
        tokio_util::sync::CancellationToken::cancel(self);
    }
}

impl<T: Send> Cancellable for tokio::task::JoinHandle<T> {
    fn cancel(&self) {
        self.abort();
    }
}

impl Cancellable for tokio::task::AbortHandle {
    fn cancel(&self) {
        self.abort();
    }
}

impl<C: Cancellable + ?Sized> Cancellable for Box<C> {
    fn cancel(&self) {
        (**self).cancel();
    }
}

impl<C: Cancellable + ?Sized> Cancellable for Arc<C> {
    fn cancel(&self) {
        (**self).cancel();
    }
}

impl<C: Cancellable + ?Sized> Cancellable for &C {
    fn cancel(&self) {
        (**self).cancel();
    }
}

impl<C: Cancellable> Cancellable for Option<C> {
    fn cancel(&self) {
        if let Some(inner) = self {
            inner.cancel();
        }
    }
}

/// Cancellation handle that runs a closure at most once.
pub struct CancelFn {
    f: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl CancelFn {
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self {
            f: Mutex::new(Some(Box::new(f))),
        }
    }

    /// Whether the closure has already run.
    pub fn is_cancelled(&self) -> bool {
        self.f.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }
}

impl Cancellable for CancelFn {
    fn cancel(&self) {
        let f = self.f.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(f) = f {
            f();
        }
    }
}

impl std::fmt::Debug for CancelFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelFn")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Shorthand for [`CancelFn::new`].
pub fn on_cancel(f: impl FnOnce() + Send + 'static) -> CancelFn {
    CancelFn::new(f)
}
