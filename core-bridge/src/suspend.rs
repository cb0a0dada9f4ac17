//! Cooperative-suspension bridge.
//!
//! [`suspend`] turns a two-callback producer into a future. The calling task
//! yields to its scheduler instead of blocking a thread, and resumes exactly
//! once, when either [`OnValue::resume`] or [`OnError::resume`] fires.
//!
//! - A panic raised while invoking the producer itself resumes the task with
//!   [`Error::Execution`] wrapping a [`Panicked`] cause.
//! - Resuming twice is a programming error and panics on the thread that
//!   attempts the second resumption.
//! - If both callbacks are dropped unused the task resumes with
//!   [`Error::Execution`] wrapping [`Abandoned`] rather than hanging.
//!
//! The bridge is built on `futures::channel::oneshot` and does not depend on
//! a particular runtime.
//!
//! # Examples
//!
//! ```rust
//! use core_bridge::suspend::{suspend, OnError, OnValue};
//!
//! # futures::executor::block_on(async {
//! let value = suspend(|on_value: OnValue<u32>, _on_error: OnError<u32>| {
//!     std::thread::spawn(move || on_value.resume(9));
//! })
//! .await
//! .unwrap();
//! assert_eq!(value, 9);
//! # });
//! ```

use crate::error::{Abandoned, BoxError, Error, Panicked, Result};
use futures::channel::oneshot;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

struct Continuation<T> {
    sender: Mutex<Option<oneshot::Sender<Result<T>>>>,
}

impl<T> Continuation<T> {
    /// Delivers `result` unless the continuation was already resumed.
    fn try_resume(&self, result: Result<T>) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            Some(sender) => {
                if sender.send(result).is_err() {
                    tracing::trace!("suspended computation was dropped before resumption");
                }
                true
            }
            None => false,
        }
    }

    fn resume(&self, result: Result<T>) {
        if !self.try_resume(result) {
            panic!("continuation resumed more than once");
        }
    }
}

/// Resumes the suspended computation with a value.
pub struct OnValue<T> {
    continuation: Arc<Continuation<T>>,
}

impl<T> OnValue<T> {
    /// # Panics
    ///
    /// If the computation was already resumed.
    pub fn resume(self, value: T) {
        self.continuation.resume(Ok(value));
    }
}

/// Resumes the suspended computation with a failure.
pub struct OnError<T> {
    continuation: Arc<Continuation<T>>,
}

impl<T> OnError<T> {
    /// Resumes with [`Error::Execution`] wrapping `error`.
    ///
    /// # Panics
    ///
    /// If the computation was already resumed.
    pub fn resume(self, error: impl Into<BoxError>) {
        self.continuation.resume(Err(Error::Execution(error.into())));
    }
}

/// Suspends the calling task until `f`'s callbacks resume it.
///
/// `f` runs synchronously on the calling task. Its return value is kept
/// alive until the task resumes, so it can hold a guard or handle tied to
/// the in-flight operation.
pub async fn suspend<T, R, F>(f: F) -> Result<T>
where
    F: FnOnce(OnValue<T>, OnError<T>) -> R,
{
    let (sender, receiver) = oneshot::channel();
    let continuation = Arc::new(Continuation {
        sender: Mutex::new(Some(sender)),
    });
    let on_value = OnValue {
        continuation: Arc::clone(&continuation),
    };
    let on_error = OnError {
        continuation: Arc::clone(&continuation),
    };

    let _held = match panic::catch_unwind(AssertUnwindSafe(|| f(on_value, on_error))) {
        Ok(held) => Some(held),
        Err(payload) => {
            let cause = Panicked::from_payload(payload.as_ref());
            tracing::debug!(message = %cause.message, "producer panicked while suspending");
            if !continuation.try_resume(Err(Error::execution(cause))) {
                tracing::warn!("producer panicked after resuming; keeping first resumption");
            }
            None
        }
    };
    // Only the callbacks may keep the sender alive, so dropping them all
    // cancels the receiver.
    drop(continuation);

    match receiver.await {
        Ok(result) => result,
        Err(oneshot::Canceled) => Err(Error::execution(Abandoned)),
    }
}
