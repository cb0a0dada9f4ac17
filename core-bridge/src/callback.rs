//! Blocking bridge for producers that only accept a result callback.
//!
//! Such producers hand back no cancellation handle, so the wait is bounded by
//! a timeout instead (default [`DEFAULT_CALLBACK_TIMEOUT`], configurable via
//! [`BridgeConfig::callback_timeout`] or [`CallbackBridge::new`]). When the
//! budget runs out the latch is abandoned; a callback firing later is a no-op.
//!
//! Three callback shapes are supported:
//!
//! - value only: [`CallbackBridge::run`], producer receives [`Callback<T>`]
//! - value or error: [`CallbackBridge::run_fallible`], producer receives
//!   `Callback<Result<T, E>>`
//! - no result: [`CallbackBridge::run_no_result`], producer receives [`Done`];
//!   a timeout is reported as `Ok(false)` rather than an error
//!
//! # Examples
//!
//! ```rust
//! use core_bridge::callback::{run_blocking, Callback};
//!
//! let answer = run_blocking(|callback: Callback<u32>| {
//!     std::thread::spawn(move || callback.call(42));
//! })
//! .unwrap();
//! assert_eq!(answer, 42);
//! ```

use crate::config::{BridgeConfig, DEFAULT_CALLBACK_TIMEOUT};
use crate::error::{BoxError, Error, Result};
use crate::latch::{LatchSignal, Outcome, Signal, TerminalLatch, TimedOut};
use std::time::Duration;

/// One-shot result callback handed to a callback-only producer.
///
/// Calling it consumes it. Dropping it without calling is not a signal: the
/// bridge keeps waiting until its timeout.
pub struct Callback<T> {
    signal: LatchSignal<T, BoxError>,
}

impl<T> Callback<T> {
    pub fn call(self, value: T) {
        self.signal.signal(Signal::Value(value));
    }
}

impl<T, E> Callback<std::result::Result<T, E>> {
    pub fn ok(self, value: T) {
        self.call(Ok(value));
    }

    pub fn err(self, error: E) {
        self.call(Err(error));
    }
}

/// Completion callback for producers without a result.
pub struct Done {
    signal: LatchSignal<(), BoxError>,
}

impl Done {
    pub fn call(self) {
        self.signal.signal(Signal::Completed);
    }
}

/// Callback-style bridge with a fixed wait budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackBridge {
    timeout: Duration,
}

impl Default for CallbackBridge {
    fn default() -> Self {
        Self::new(DEFAULT_CALLBACK_TIMEOUT)
    }
}

impl CallbackBridge {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.callback_timeout)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Invokes `producer` and blocks until it calls back with a value.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if no value arrives within the budget
    /// - [`Error::Interrupted`] if the calling thread is interrupted
    pub fn run<T, F>(&self, producer: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Callback<T>),
    {
        let latch = TerminalLatch::new();
        producer(Callback {
            signal: latch.signaller(),
        });

        match self.wait(latch)? {
            Outcome::Value(value) => Ok(value),
            Outcome::Error(cause) => Err(Error::Execution(cause)),
            Outcome::Completed => unreachable!("value callbacks never complete empty"),
            Outcome::Interrupted => Err(Error::Interrupted),
        }
    }

    /// Like [`run`](Self::run) for producers reporting `Result<T, E>`; an
    /// `Err` becomes [`Error::Execution`].
    pub fn run_fallible<T, E, F>(&self, producer: F) -> Result<T>
    where
        T: Send + 'static,
        E: Into<BoxError> + Send + 'static,
        F: FnOnce(Callback<std::result::Result<T, E>>),
    {
        self.run(producer)?.map_err(|e| Error::Execution(e.into()))
    }

    /// Invokes `producer` and waits for it to call [`Done::call`].
    ///
    /// Returns `Ok(true)` if it did within the budget and `Ok(false)` on
    /// timeout. Only interruption is an error here.
    pub fn run_no_result<F>(&self, producer: F) -> Result<bool>
    where
        F: FnOnce(Done),
    {
        let latch = TerminalLatch::new();
        producer(Done {
            signal: latch.signaller(),
        });

        match self.wait(latch) {
            Ok(Outcome::Interrupted) => Err(Error::Interrupted),
            Ok(_) => Ok(true),
            Err(_) => Ok(false),
        }
    }

    fn wait<T>(&self, latch: TerminalLatch<T, BoxError>) -> Result<Outcome<T, BoxError>>
    where
        T: Send + 'static,
    {
        latch
            .wait_timeout(self.timeout, None)
            .map_err(|TimedOut| Error::Timeout(self.timeout))
    }
}

/// [`CallbackBridge::run`] with the default timeout.
pub fn run_blocking<T, F>(producer: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(Callback<T>),
{
    CallbackBridge::default().run(producer)
}

/// [`CallbackBridge::run_fallible`] with the default timeout.
pub fn run_fallible_blocking<T, E, F>(producer: F) -> Result<T>
where
    T: Send + 'static,
    E: Into<BoxError> + Send + 'static,
    F: FnOnce(Callback<std::result::Result<T, E>>),
{
    CallbackBridge::default().run_fallible(producer)
}

/// [`CallbackBridge::run_no_result`] with the default timeout.
pub fn run_no_result_blocking<F>(producer: F) -> Result<bool>
where
    F: FnOnce(Done),
{
    CallbackBridge::default().run_no_result(producer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn value_from_worker_thread() {
        let value = CallbackBridge::new(Duration::from_secs(5))
            .run(|callback: Callback<&'static str>| {
                thread::spawn(move || callback.call("done"));
            })
            .unwrap();
        assert_eq!(value, "done");
    }

    #[test]
    fn zero_timeout_does_not_block() {
        let start = Instant::now();
        let err = CallbackBridge::new(Duration::ZERO)
            .run(|_callback: Callback<u8>| {})
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn late_callback_is_harmless() {
        let (tx, rx) = mpsc::channel();
        let err = CallbackBridge::new(Duration::from_millis(10))
            .run(|callback: Callback<u8>| tx.send(callback).unwrap())
            .unwrap_err();
        assert!(err.is_timeout());

        let callback = rx.recv().unwrap();
        thread::spawn(move || callback.call(1)).join().unwrap();
    }

    #[test]
    fn fallible_error_is_execution() {
        let err = CallbackBridge::new(Duration::from_secs(5))
            .run_fallible(|callback: Callback<std::result::Result<u8, String>>| {
                callback.err("boom".to_string())
            })
            .unwrap_err();
        assert!(err.is_execution());
        assert_eq!(err.cause().unwrap().to_string(), "boom");
    }

    #[test]
    fn no_result_reports_timeout_as_false() {
        let bridge = CallbackBridge::new(Duration::from_millis(50));
        assert!(bridge.run_no_result(|done| done.call()).unwrap());
        assert!(!bridge.run_no_result(|_done| {}).unwrap());
    }

    #[test]
    fn no_result_interrupted() {
        interrupt::clear();
        interrupt::current().interrupt();
        let err = CallbackBridge::new(Duration::from_secs(5))
            .run_no_result(|_done| {})
            .unwrap_err();
        assert!(err.is_interrupted());
        assert!(interrupt::interrupted());
    }

    #[test]
    fn config_supplies_timeout() {
        let config = BridgeConfig::default().with_callback_timeout(Duration::from_millis(75));
        assert_eq!(
            CallbackBridge::from_config(&config).timeout(),
            Duration::from_millis(75)
        );
        assert_eq!(CallbackBridge::default().timeout(), DEFAULT_CALLBACK_TIMEOUT);
    }

    #[test]
    fn maximal_timeout_returns_value() {
        let value = CallbackBridge::new(Duration::MAX)
            .run(|callback: Callback<u8>| callback.call(1))
            .unwrap();
        assert_eq!(value, 1);
    }

    #[test]
    fn fallible_free_function() {
        let value = run_fallible_blocking(|callback: Callback<std::result::Result<u8, String>>| {
            thread::spawn(move || callback.ok(9));
        })
        .unwrap();
        assert_eq!(value, 9);

        let err = run_fallible_blocking(|callback: Callback<std::result::Result<u8, String>>| {
            callback.err("denied".to_string())
        })
        .unwrap_err();
        assert_eq!(err.cause().unwrap().to_string(), "denied");
    }
}
