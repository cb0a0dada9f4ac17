//! Blocking bridges over asynchronous producers.
//!
//! Each bridge subscribes to a producer, parks the calling thread on a
//! [`TerminalLatch`] and maps the terminal signal to a return value or an
//! [`Error`]:
//!
//! | Bridge | `Completed` | value | `Error(e)` | interrupted |
//! |---|---|---|---|---|
//! | [`collect_blocking`] | accumulated values | appended | `Execution(e)` | `Interrupted` |
//! | [`single_blocking`] | `Execution(MissingResult)` | returned | `Execution(e)` | `Interrupted` |
//! | [`complete_blocking`] | `()` | n/a | `Execution(e)` | `Interrupted` |
//!
//! When the waiting thread is interrupted the producer's handle is cancelled
//! before the error is returned, and the interrupt status stays set.
//!
//! # Blocking inside a runtime
//!
//! These calls park the calling thread. If that thread is the only one
//! driving the producer (a current-thread Tokio runtime whose tasks feed the
//! emitter) the producer never runs. The [`adapters`](crate::adapters)
//! sources report that case as an error up front; hand-written producers
//! must avoid it themselves.
//!
//! # Examples
//!
//! ```rust
//! use core_bridge::blocking::collect_blocking;
//! use core_bridge::source::StreamEmitter;
//!
//! let values = collect_blocking(|emitter: StreamEmitter<u32>| {
//!     std::thread::spawn(move || {
//!         for v in 1..=3 {
//!             emitter.next(v);
//!         }
//!         emitter.complete();
//!     });
//! })
//! .unwrap();
//! assert_eq!(values, vec![1, 2, 3]);
//! ```

use crate::cancel::Cancellable;
use crate::error::{BoxError, Error, MissingResult, Result};
use crate::latch::{Outcome, TerminalLatch};
use crate::source::{
    CompletableSource, CompletionEmitter, MaybeEmitter, MaybeSource, Publisher, StreamEmitter,
};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Blocks until `publisher` completes and returns every value it emitted, in
/// emission order.
pub fn collect_blocking<T, P>(publisher: P) -> Result<Vec<T>>
where
    T: Send + 'static,
    P: Publisher<T>,
{
    collect(publisher, None)
}

/// [`collect_blocking`] with a wait budget. On timeout the producer is
/// cancelled and [`Error::Timeout`] is returned.
pub fn collect_blocking_timeout<T, P>(publisher: P, timeout: Duration) -> Result<Vec<T>>
where
    T: Send + 'static,
    P: Publisher<T>,
{
    collect(publisher, Some(timeout))
}

/// Blocks until `source` produces its value.
///
/// An empty completion is an [`Error::Execution`] wrapping [`MissingResult`].
pub fn single_blocking<T, S>(source: S) -> Result<T>
where
    T: Send + 'static,
    S: MaybeSource<T>,
{
    single(source, None)
}

pub fn single_blocking_timeout<T, S>(source: S, timeout: Duration) -> Result<T>
where
    T: Send + 'static,
    S: MaybeSource<T>,
{
    single(source, Some(timeout))
}

/// Blocks until `source` completes.
pub fn complete_blocking<S>(source: S) -> Result<()>
where
    S: CompletableSource,
{
    complete(source, None)
}

pub fn complete_blocking_timeout<S>(source: S, timeout: Duration) -> Result<()>
where
    S: CompletableSource,
{
    complete(source, Some(timeout))
}

fn collect<T, P>(publisher: P, timeout: Option<Duration>) -> Result<Vec<T>>
where
    T: Send + 'static,
    P: Publisher<T>,
{
    let latch = TerminalLatch::new();
    let values = Arc::new(Mutex::new(Vec::new()));
    let handle = publisher.subscribe(StreamEmitter::new(Arc::clone(&values), latch.signaller()));

    match await_outcome(latch, &handle, timeout)? {
        Outcome::Completed | Outcome::Value(()) => {
            let mut values = values.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(std::mem::take(&mut *values))
        }
        Outcome::Error(cause) => Err(Error::Execution(cause)),
        Outcome::Interrupted => Err(Error::Interrupted),
    }
}

fn single<T, S>(source: S, timeout: Option<Duration>) -> Result<T>
where
    T: Send + 'static,
    S: MaybeSource<T>,
{
    let latch = TerminalLatch::new();
    let handle = source.subscribe(MaybeEmitter::new(latch.signaller()));

    match await_outcome(latch, &handle, timeout)? {
        Outcome::Value(value) => Ok(value),
        Outcome::Completed => Err(Error::execution(MissingResult)),
        Outcome::Error(cause) => Err(Error::Execution(cause)),
        Outcome::Interrupted => Err(Error::Interrupted),
    }
}

fn complete<S>(source: S, timeout: Option<Duration>) -> Result<()>
where
    S: CompletableSource,
{
    let latch = TerminalLatch::new();
    let handle = source.subscribe(CompletionEmitter::new(latch.signaller()));

    match await_outcome(latch, &handle, timeout)? {
        Outcome::Completed | Outcome::Value(()) => Ok(()),
        Outcome::Error(cause) => Err(Error::Execution(cause)),
        Outcome::Interrupted => Err(Error::Interrupted),
    }
}

fn await_outcome<T, H>(
    latch: TerminalLatch<T, BoxError>,
    handle: &H,
    timeout: Option<Duration>,
) -> Result<Outcome<T, BoxError>>
where
    T: Send + 'static,
    H: Cancellable,
{
    let Some(timeout) = timeout else {
        return Ok(latch.wait(Some(handle)));
    };

    latch.wait_timeout(timeout, Some(handle)).map_err(|_| {
        tracing::debug!(?timeout, "cancelling producer after timeout");
        handle.cancel();
        Error::Timeout(timeout)
    })
}
