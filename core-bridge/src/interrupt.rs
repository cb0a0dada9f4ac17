//! Per-thread interrupt status.
//!
//! Rust threads carry no interruption flag of their own, so the bridges keep
//! one per thread. Any thread can obtain an [`Interrupter`] for itself via
//! [`current`] and hand it to another thread; calling
//! [`Interrupter::interrupt`] sets the flag and wakes the interruptible wait
//! the owning thread is blocked in, if any.
//!
//! # Examples
//!
//! ```rust
//! use core_bridge::interrupt;
//! use std::time::Duration;
//!
//! let me = interrupt::current();
//! std::thread::spawn(move || me.interrupt());
//!
//! // Returns early once the interrupt lands.
//! let slept = interrupt::sleep(Duration::from_secs(10));
//! assert!(slept.unwrap_err().is_interrupted());
//! assert!(interrupt::interrupted());
//! ```

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

type WakeFn = Arc<dyn Fn() + Send + Sync>;

struct InterruptState {
    flag: AtomicBool,
    /// Wakes the wait the owning thread is currently parked in.
    wake: Mutex<Option<WakeFn>>,
}

thread_local! {
    static CURRENT: Arc<InterruptState> = Arc::new(InterruptState {
        flag: AtomicBool::new(false),
        wake: Mutex::new(None),
    });
}

/// Handle used to interrupt a specific thread.
#[derive(Clone)]
pub struct Interrupter {
    state: Arc<InterruptState>,
}

impl Interrupter {
    /// Sets the owning thread's interrupt status and wakes its current
    /// interruptible wait.
    pub fn interrupt(&self) {
        self.state.flag.store(true, Ordering::SeqCst);
        let wake = self
            .state
            .wake
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(wake) = wake {
            wake();
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.state.flag.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Interrupter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interrupter")
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

/// Returns the interrupter of the calling thread.
pub fn current() -> Interrupter {
    CURRENT.with(|state| Interrupter {
        state: Arc::clone(state),
    })
}

/// Whether the calling thread's interrupt status is set.
pub fn is_interrupted() -> bool {
    CURRENT.with(|state| state.flag.load(Ordering::SeqCst))
}

/// Reads and clears the calling thread's interrupt status.
pub fn interrupted() -> bool {
    CURRENT.with(|state| state.flag.swap(false, Ordering::SeqCst))
}

/// Clears the calling thread's interrupt status.
pub fn clear() {
    interrupted();
}

/// Registers `wake` to run when the calling thread is interrupted, until the
/// returned guard is dropped.
///
/// The hook must take the lock the waiter checks the flag under before
/// notifying, otherwise the wake-up can be lost.
pub(crate) fn on_interrupt(wake: WakeFn) -> WakeGuard {
    let state = CURRENT.with(Arc::clone);
    *state.wake.lock().unwrap_or_else(PoisonError::into_inner) = Some(wake);
    WakeGuard { state }
}

pub(crate) struct WakeGuard {
    state: Arc<InterruptState>,
}

impl Drop for WakeGuard {
    fn drop(&mut self) {
        *self.state.wake.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Sleeps for `duration`, returning [`Error::Interrupted`] as soon as the
/// calling thread is interrupted. The interrupt status stays set.
///
/// A duration too large to express as a deadline sleeps until interrupted.
pub fn sleep(duration: Duration) -> Result<()> {
    let gate = Arc::new((Mutex::new(()), Condvar::new()));
    let hook = Arc::clone(&gate);
    let _guard = on_interrupt(Arc::new(move || {
        let _lock = hook.0.lock().unwrap_or_else(PoisonError::into_inner);
        hook.1.notify_all();
    }));

    let deadline = Instant::now().checked_add(duration);
    let mut lock = gate.0.lock().unwrap_or_else(PoisonError::into_inner);
    loop {
        if is_interrupted() {
            return Err(Error::Interrupted);
        }
        lock = match deadline {
            None => gate.1.wait(lock).unwrap_or_else(PoisonError::into_inner),
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(());
                }
                gate.1
                    .wait_timeout(lock, deadline - now)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn flag_round_trip() {
        clear();
        assert!(!is_interrupted());
        current().interrupt();
        assert!(is_interrupted());
        assert!(interrupted());
        assert!(!is_interrupted());
    }

    #[test]
    fn interrupter_targets_its_own_thread() {
        clear();
        let other = thread::spawn(|| {
            let me = current();
            me.interrupt();
            is_interrupted()
        })
        .join()
        .unwrap();
        assert!(other);
        assert!(!is_interrupted());
    }

    #[test]
    fn sleep_returns_early_on_interrupt() {
        clear();
        let me = current();
        let helper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            me.interrupt();
        });

        let start = Instant::now();
        let err = sleep(Duration::from_secs(10)).unwrap_err();
        assert!(err.is_interrupted());
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(interrupted());
        helper.join().unwrap();
    }

    #[test]
    fn sleep_completes_without_interrupt() {
        clear();
        sleep(Duration::from_millis(10)).unwrap();
        assert!(!is_interrupted());
    }

    #[test]
    fn unbounded_sleep_ends_on_interrupt() {
        clear();
        let me = current();
        let helper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            me.interrupt();
        });

        assert!(sleep(Duration::MAX).unwrap_err().is_interrupted());
        assert!(interrupted());
        helper.join().unwrap();
    }
}
