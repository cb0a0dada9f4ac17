//! Producers backed by Tokio futures and streams.
//!
//! These adapters drive an async computation on a runtime [`Handle`] and feed
//! its outcome into the emitters of the blocking bridges. The returned handle
//! is a [`CancellationToken`]; cancelling it stops the driving task, and no
//! further signals are delivered.
//!
//! A blocking bridge parks the subscribing thread. If that thread sits in a
//! current-thread runtime and the source is spawned on a current-thread
//! runtime, nothing would ever poll the driving task, so the source fails
//! immediately with [`RuntimeStalled`] instead of hanging.
//!
//! # Examples
//!
//! ```rust
//! use core_bridge::adapters::stream_publisher;
//! use core_bridge::blocking::collect_blocking;
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let stream = futures::stream::iter(vec![Ok::<_, std::io::Error>(1), Ok(2), Ok(3)]);
//! let values = collect_blocking(stream_publisher(runtime.handle().clone(), stream)).unwrap();
//! assert_eq!(values, vec![1, 2, 3]);
//! ```

use crate::error::{BoxError, RuntimeStalled};
use crate::source::{
    CompletableSource, CompletionEmitter, MaybeEmitter, MaybeSource, Publisher, StreamEmitter,
};
use futures::{Stream, StreamExt};
use std::future::Future;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio_util::sync::CancellationToken;

/// Whether a task spawned on `handle` could not run while the calling thread
/// blocks. Runtime identity is not observable, so any current-thread caller
/// paired with a current-thread source counts.
fn stalls_caller(handle: &Handle) -> bool {
    handle.runtime_flavor() == RuntimeFlavor::CurrentThread
        && Handle::try_current()
            .map(|current| current.runtime_flavor() == RuntimeFlavor::CurrentThread)
            .unwrap_or(false)
}

/// [`Publisher`] over a fallible stream.
pub struct StreamPublisher<S> {
    handle: Handle,
    stream: S,
}

pub fn stream_publisher<S>(handle: Handle, stream: S) -> StreamPublisher<S> {
    StreamPublisher { handle, stream }
}

impl<S, T, E> Publisher<T> for StreamPublisher<S>
where
    S: Stream<Item = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    type Handle = CancellationToken;

    fn subscribe(self, emitter: StreamEmitter<T>) -> CancellationToken {
        let Self { handle, stream } = self;
        let token = CancellationToken::new();
        if stalls_caller(&handle) {
            tracing::warn!("source would be driven by the thread waiting on it");
            emitter.error(RuntimeStalled);
            return token;
        }
        let cancelled = token.clone();

        handle.spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    tracing::debug!("stream subscription cancelled");
                }
                _ = drive_stream(stream, emitter) => {}
            }
        });

        token
    }
}

async fn drive_stream<S, T, E>(stream: S, emitter: StreamEmitter<T>)
where
    S: Stream<Item = Result<T, E>>,
    E: Into<BoxError>,
{
    let mut stream = std::pin::pin!(stream);
    while let Some(item) = stream.next().await {
        if emitter.is_closed() {
            return;
        }
        match item {
            Ok(value) => emitter.next(value),
            Err(e) => {
                emitter.error(e);
                return;
            }
        }
    }
    emitter.complete();
}

/// [`MaybeSource`] over a future resolving to `Ok(Some(value))`,
/// `Ok(None)` (empty completion) or `Err(e)`.
pub struct FutureSource<F> {
    handle: Handle,
    future: F,
}

pub fn future_source<F>(handle: Handle, future: F) -> FutureSource<F> {
    FutureSource { handle, future }
}

impl<F, T, E> MaybeSource<T> for FutureSource<F>
where
    F: Future<Output = Result<Option<T>, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    type Handle = CancellationToken;

    fn subscribe(self, emitter: MaybeEmitter<T>) -> CancellationToken {
        let Self { handle, future } = self;
        let token = CancellationToken::new();
        if stalls_caller(&handle) {
            tracing::warn!("source would be driven by the thread waiting on it");
            emitter.error(RuntimeStalled);
            return token;
        }
        let cancelled = token.clone();

        handle.spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    tracing::debug!("future subscription cancelled");
                }
                result = future => match result {
                    Ok(Some(value)) => emitter.success(value),
                    Ok(None) => emitter.complete(),
                    Err(e) => emitter.error(e),
                },
            }
        });

        token
    }
}

/// [`CompletableSource`] over a future resolving to `Result<(), E>`.
pub struct CompletionSource<F> {
    handle: Handle,
    future: F,
}

pub fn completion_source<F>(handle: Handle, future: F) -> CompletionSource<F> {
    CompletionSource { handle, future }
}

impl<F, E> CompletableSource for CompletionSource<F>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    type Handle = CancellationToken;

    fn subscribe(self, emitter: CompletionEmitter) -> CancellationToken {
        let Self { handle, future } = self;
        let token = CancellationToken::new();
        if stalls_caller(&handle) {
            tracing::warn!("source would be driven by the thread waiting on it");
            emitter.error(RuntimeStalled);
            return token;
        }
        let cancelled = token.clone();

        handle.spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    tracing::debug!("completion subscription cancelled");
                }
                result = future => match result {
                    Ok(()) => emitter.complete(),
                    Err(e) => emitter.error(e),
                },
            }
        });

        token
    }
}
