//! One-shot terminal latch.
//!
//! A [`TerminalLatch`] is signalled exactly once, from any thread, with a
//! [`Signal`] and waited on by a single owner. The first signal wins; later
//! signals are ignored. A waiter that is interrupted or times out abandons
//! the latch, after which every signal is dropped.
//!
//! # Examples
//!
//! ```rust
//! use core_bridge::latch::{Outcome, Signal, TerminalLatch};
//!
//! let latch = TerminalLatch::<u32, String>::new();
//! let signaller = latch.signaller();
//! std::thread::spawn(move || {
//!     signaller.signal(Signal::Value(7));
//! });
//!
//! match latch.wait(None) {
//!     Outcome::Value(v) => assert_eq!(v, 7),
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! ```

use crate::cancel::Cancellable;
use crate::interrupt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Terminal event written by a producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal<T, E> {
    Value(T),
    Error(E),
    /// Successful termination without a value.
    Completed,
}

/// What the waiter observed.
///
/// `Interrupted` is only ever produced by the waiting side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    Value(T),
    Error(E),
    Completed,
    Interrupted,
}

impl<T, E> From<Signal<T, E>> for Outcome<T, E> {
    fn from(signal: Signal<T, E>) -> Self {
        match signal {
            Signal::Value(v) => Outcome::Value(v),
            Signal::Error(e) => Outcome::Error(e),
            Signal::Completed => Outcome::Completed,
        }
    }
}

/// Returned by [`TerminalLatch::wait_timeout`] when the budget runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut;

enum Slot<T, E> {
    Empty,
    Settled(Signal<T, E>),
    Abandoned,
}

struct Inner<T, E> {
    slot: Mutex<Slot<T, E>>,
    cond: Condvar,
}

impl<T, E> Inner<T, E> {
    fn lock(&self) -> MutexGuard<'_, Slot<T, E>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Waiting side of a one-shot latch.
pub struct TerminalLatch<T, E> {
    inner: Arc<Inner<T, E>>,
}

/// Producer side of a [`TerminalLatch`]. Cheap to clone.
pub struct LatchSignal<T, E> {
    inner: Arc<Inner<T, E>>,
}

impl<T, E> Clone for LatchSignal<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> LatchSignal<T, E> {
    /// Stores `signal` if nothing has been stored yet and wakes the waiter.
    ///
    /// Returns `false` when the latch was already settled or abandoned; the
    /// signal is dropped in that case.
    pub fn signal(&self, signal: Signal<T, E>) -> bool {
        let mut slot = self.inner.lock();
        match *slot {
            Slot::Empty => {
                *slot = Slot::Settled(signal);
                drop(slot);
                self.inner.cond.notify_all();
                true
            }
            Slot::Settled(_) => {
                tracing::trace!("ignoring terminal signal on a settled latch");
                false
            }
            Slot::Abandoned => {
                tracing::trace!("ignoring terminal signal on an abandoned latch");
                false
            }
        }
    }

    /// Whether a signal has been stored or the waiter gave up.
    pub fn is_settled(&self) -> bool {
        !matches!(*self.inner.lock(), Slot::Empty)
    }
}

impl<T, E> Default for TerminalLatch<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> TerminalLatch<T, E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                slot: Mutex::new(Slot::Empty),
                cond: Condvar::new(),
            }),
        }
    }

    pub fn signaller(&self) -> LatchSignal<T, E> {
        LatchSignal {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Blocks until the latch is signalled or the calling thread is
    /// interrupted.
    ///
    /// On interruption `cancel` is invoked once, the thread's interrupt
    /// status is left set and [`Outcome::Interrupted`] is returned.
    pub fn wait(self, cancel: Option<&dyn Cancellable>) -> Outcome<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        match self.wait_until(None, cancel) {
            Ok(outcome) => outcome,
            Err(TimedOut) => unreachable!("wait without deadline cannot time out"),
        }
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`.
    ///
    /// Timing out abandons the latch but does not invoke `cancel`. A timeout
    /// too large to express as a deadline waits without one.
    pub fn wait_timeout(
        self,
        timeout: Duration,
        cancel: Option<&dyn Cancellable>,
    ) -> Result<Outcome<T, E>, TimedOut>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        self.wait_until(Instant::now().checked_add(timeout), cancel)
    }

    fn wait_until(
        self,
        deadline: Option<Instant>,
        cancel: Option<&dyn Cancellable>,
    ) -> Result<Outcome<T, E>, TimedOut>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let hook = Arc::clone(&self.inner);
        let _wake = interrupt::on_interrupt(Arc::new(move || {
            let _slot = hook.lock();
            hook.cond.notify_all();
        }));

        let mut slot = self.inner.lock();
        loop {
            if let Slot::Settled(_) = *slot {
                return match std::mem::replace(&mut *slot, Slot::Abandoned) {
                    Slot::Settled(signal) => Ok(signal.into()),
                    _ => unreachable!(),
                };
            }

            if interrupt::is_interrupted() {
                *slot = Slot::Abandoned;
                drop(slot);
                tracing::debug!("latch wait interrupted before a terminal signal");
                if let Some(cancel) = cancel {
                    tracing::debug!("requesting producer cancellation");
                    cancel.cancel();
                }
                return Ok(Outcome::Interrupted);
            }

            slot = match deadline {
                None => self
                    .inner
                    .cond
                    .wait(slot)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        *slot = Slot::Abandoned;
                        tracing::debug!("latch wait timed out");
                        return Err(TimedOut);
                    }
                    self.inner
                        .cond
                        .wait_timeout(slot, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::on_cancel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn first_signal_wins() {
        let latch = TerminalLatch::<u32, &str>::new();
        let signaller = latch.signaller();
        assert!(signaller.signal(Signal::Value(1)));
        assert!(!signaller.signal(Signal::Value(2)));
        assert!(!signaller.signal(Signal::Error("late")));
        assert!(signaller.is_settled());
        assert_eq!(latch.wait(None), Outcome::Value(1));
    }

    #[test]
    fn signal_from_another_thread() {
        interrupt::clear();
        let latch = TerminalLatch::<(), String>::new();
        let signaller = latch.signaller();
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            signaller.signal(Signal::Error("boom".to_string()));
            signaller.signal(Signal::Completed)
        });
        assert_eq!(latch.wait(None), Outcome::Error("boom".to_string()));
        assert!(!producer.join().unwrap());
    }

    #[test]
    fn interrupt_cancels_once_and_keeps_status() {
        interrupt::clear();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cancel = on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let latch = TerminalLatch::<u32, ()>::new();
        let signaller = latch.signaller();
        let me = interrupt::current();
        let helper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            me.interrupt();
        });

        assert_eq!(latch.wait(Some(&cancel)), Outcome::Interrupted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(interrupt::is_interrupted());
        assert!(!signaller.signal(Signal::Value(1)));
        helper.join().unwrap();
        interrupt::clear();
    }

    #[test]
    fn stored_signal_beats_pending_interrupt() {
        interrupt::clear();
        let latch = TerminalLatch::<u32, ()>::new();
        latch.signaller().signal(Signal::Value(3));
        interrupt::current().interrupt();
        assert_eq!(latch.wait(None), Outcome::Value(3));
        assert!(interrupt::interrupted());
    }

    #[test]
    fn timeout_abandons_without_cancelling() {
        interrupt::clear();
        let cancel = on_cancel(|| {});
        let latch = TerminalLatch::<u32, ()>::new();
        let signaller = latch.signaller();
        assert_eq!(
            latch.wait_timeout(Duration::ZERO, Some(&cancel)),
            Err(TimedOut)
        );
        assert!(!cancel.is_cancelled());
        assert!(!signaller.signal(Signal::Completed));
    }

    #[test]
    fn unrepresentable_deadline_waits_without_one() {
        interrupt::clear();
        let latch = TerminalLatch::<u32, ()>::new();
        let signaller = latch.signaller();
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            signaller.signal(Signal::Value(4))
        });
        assert_eq!(
            latch.wait_timeout(Duration::MAX, None),
            Ok(Outcome::Value(4))
        );
        assert!(producer.join().unwrap());
    }
}
