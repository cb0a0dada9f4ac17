//! Blocking and cooperative bridges over asynchronous producers.
//!
//! This crate turns asynchronous, callback-driven or cooperatively scheduled
//! operations into synchronous calls without losing error fidelity,
//! interruption semantics or threads.
//!
//! # Modules
//!
//! - `latch`: one-shot terminal latch the blocking bridges park on
//! - `interrupt`: per-thread interrupt status and [`Interrupter`] handles
//! - `cancel`: [`Cancellable`] handles returned by producers
//! - `source`: producer shapes ([`Publisher`], [`MaybeSource`],
//!   [`CompletableSource`]) and their emitters
//! - `blocking`: wait for the terminal signal of a producer
//! - `callback`: bridge for producers that only accept a result callback
//! - `executor` / `uninterruptible`: run work to completion on another
//!   thread regardless of the caller's interruption
//! - `suspend`: two-callback producers as futures
//! - `adapters`: producers backed by Tokio futures and streams
//! - `config`: timeouts and pool settings
//!
//! # Errors
//!
//! Every bridge returns [`Result<T>`]. Failures are exactly one of
//! [`Error::Execution`] (with the producer's cause), [`Error::Interrupted`]
//! or [`Error::Timeout`].
//!
//! # Examples
//!
//! ```rust
//! use core_bridge::{single_blocking, MaybeEmitter};
//!
//! let value = single_blocking(|emitter: MaybeEmitter<String>| {
//!     std::thread::spawn(move || emitter.success("hi".to_string()));
//! })
//! .unwrap();
//! assert_eq!(value, "hi");
//! ```

pub mod adapters;
pub mod blocking;
pub mod callback;
pub mod cancel;
pub mod config;
pub mod error;
pub mod executor;
pub mod interrupt;
pub mod latch;
pub mod source;
pub mod suspend;
pub mod uninterruptible;

pub use blocking::{
    collect_blocking, collect_blocking_timeout, complete_blocking, complete_blocking_timeout,
    single_blocking, single_blocking_timeout,
};
pub use callback::{
    run_blocking, run_fallible_blocking, run_no_result_blocking, Callback, CallbackBridge, Done,
};
pub use cancel::{on_cancel, CancelFn, Cancellable};
pub use config::BridgeConfig;
pub use error::{BoxError, ConfigError, Error, Result};
pub use executor::{BlockingPool, Executor, ThreadPerTask};
pub use interrupt::Interrupter;
pub use latch::{Outcome, Signal, TerminalLatch};
pub use source::{
    CompletableSource, CompletionEmitter, MaybeEmitter, MaybeSource, Publisher, StreamEmitter,
};
pub use suspend::{suspend, OnError, OnValue};
pub use uninterruptible::{run_uninterruptibly, run_uninterruptibly_on, Uninterruptible};
