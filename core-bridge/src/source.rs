//! Producer shapes consumed by the blocking bridges.
//!
//! A producer is handed an emitter and returns a [`Cancellable`] handle. The
//! shape of the producer decides which emitter it gets:
//!
//! - [`Publisher`]: zero or more values, then completion or an error
//! - [`MaybeSource`]: at most one value, an empty completion, or an error
//! - [`CompletableSource`]: completion or an error, never a value
//!
//! All three traits are implemented for closures taking the matching emitter,
//! so ad-hoc producers can be written inline.
//!
//! Emitters are `Clone + Send` and may be used from any thread. They never
//! panic; calls made after the operation settled are ignored.

use crate::cancel::Cancellable;
use crate::error::BoxError;
use crate::latch::{LatchSignal, Signal};
use std::sync::{Arc, Mutex, PoisonError};

/// A producer of zero or more values.
pub trait Publisher<T> {
    type Handle: Cancellable;

    fn subscribe(self, emitter: StreamEmitter<T>) -> Self::Handle;
}

/// A producer of at most one value.
pub trait MaybeSource<T> {
    type Handle: Cancellable;

    fn subscribe(self, emitter: MaybeEmitter<T>) -> Self::Handle;
}

/// A producer that only reports success or failure.
pub trait CompletableSource {
    type Handle: Cancellable;

    fn subscribe(self, emitter: CompletionEmitter) -> Self::Handle;
}

impl<T, F, H> Publisher<T> for F
where
    F: FnOnce(StreamEmitter<T>) -> H,
    H: Cancellable,
{
    type Handle = H;

    fn subscribe(self, emitter: StreamEmitter<T>) -> H {
        self(emitter)
    }
}

impl<T, F, H> MaybeSource<T> for F
where
    F: FnOnce(MaybeEmitter<T>) -> H,
    H: Cancellable,
{
    type Handle = H;

    fn subscribe(self, emitter: MaybeEmitter<T>) -> H {
        self(emitter)
    }
}

impl<F, H> CompletableSource for F
where
    F: FnOnce(CompletionEmitter) -> H,
    H: Cancellable,
{
    type Handle = H;

    fn subscribe(self, emitter: CompletionEmitter) -> H {
        self(emitter)
    }
}

/// Emitter handed to a [`Publisher`].
pub struct StreamEmitter<T> {
    // Values are accumulated here; the latch only ever sees the terminal
    // signal, so `Signal::Value` is unused in this shape.
    values: Arc<Mutex<Vec<T>>>,
    signal: LatchSignal<(), BoxError>,
}

impl<T> Clone for StreamEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            values: Arc::clone(&self.values),
            signal: self.signal.clone(),
        }
    }
}

impl<T> StreamEmitter<T> {
    pub(crate) fn new(values: Arc<Mutex<Vec<T>>>, signal: LatchSignal<(), BoxError>) -> Self {
        Self { values, signal }
    }

    /// Appends a value. Ignored once the stream has terminated.
    pub fn next(&self, value: T) {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        if self.signal.is_settled() {
            tracing::trace!("dropping value emitted after termination");
            return;
        }
        values.push(value);
    }

    pub fn error(&self, error: impl Into<BoxError>) {
        self.signal.signal(Signal::Error(error.into()));
    }

    pub fn complete(&self) {
        // Hold the value lock so a concurrent `next` cannot slip in after
        // completion is recorded.
        let _values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        self.signal.signal(Signal::Completed);
    }

    /// Whether the stream has terminated or the consumer gave up.
    pub fn is_closed(&self) -> bool {
        self.signal.is_settled()
    }
}

/// Emitter handed to a [`MaybeSource`].
pub struct MaybeEmitter<T> {
    signal: LatchSignal<T, BoxError>,
}

impl<T> Clone for MaybeEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T> MaybeEmitter<T> {
    pub(crate) fn new(signal: LatchSignal<T, BoxError>) -> Self {
        Self { signal }
    }

    pub fn success(&self, value: T) {
        self.signal.signal(Signal::Value(value));
    }

    pub fn error(&self, error: impl Into<BoxError>) {
        self.signal.signal(Signal::Error(error.into()));
    }

    /// Completes without a value.
    pub fn complete(&self) {
        self.signal.signal(Signal::Completed);
    }

    pub fn is_closed(&self) -> bool {
        self.signal.is_settled()
    }
}

/// Emitter handed to a [`CompletableSource`].
#[derive(Clone)]
pub struct CompletionEmitter {
    signal: LatchSignal<(), BoxError>,
}

impl CompletionEmitter {
    pub(crate) fn new(signal: LatchSignal<(), BoxError>) -> Self {
        Self { signal }
    }

    pub fn error(&self, error: impl Into<BoxError>) {
        self.signal.signal(Signal::Error(error.into()));
    }

    pub fn complete(&self) {
        self.signal.signal(Signal::Completed);
    }

    pub fn is_closed(&self) -> bool {
        self.signal.is_settled()
    }
}
