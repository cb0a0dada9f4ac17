//! Run work to completion on another thread, immune to the caller's
//! interruption.
//!
//! [`run_uninterruptibly`] submits `work` to an [`Executor`] and parks the
//! calling thread on a mutex/condvar pair until the work has finished. An
//! interrupt arriving during the wait is absorbed: the wait continues, and
//! once the result is in hand the caller's interrupt status is set again so
//! the interruption is not lost.
//!
//! A panic inside `work` is captured on the executor thread and re-raised on
//! the caller with [`std::panic::resume_unwind`].
//!
//! # Deadlock hazard
//!
//! The caller cannot return before `work` finishes. If `work` needs a lock
//! the calling thread holds, neither side makes progress. Calling this from
//! an async worker thread also stalls that worker for the duration.
//!
//! # Examples
//!
//! ```rust
//! use core_bridge::executor::ThreadPerTask;
//! use core_bridge::uninterruptible::Uninterruptible;
//!
//! let answer = Uninterruptible::on(ThreadPerTask::default())
//!     .run(|| 6 * 7)
//!     .unwrap();
//! assert_eq!(answer, 42);
//! ```

use crate::error::{Error, Result, TaskRejected};
use crate::executor::{BlockingPool, Executor};
use crate::interrupt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

enum Slot<R> {
    Pending,
    Finished(std::thread::Result<R>),
    /// The executor dropped the job without running it.
    Dropped,
}

struct TaskRecord<R> {
    slot: Mutex<Slot<R>>,
    cond: Condvar,
}

impl<R> TaskRecord<R> {
    fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<R>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self, value: Slot<R>) {
        let mut slot = self.lock();
        if let Slot::Pending = *slot {
            *slot = value;
        }
        drop(slot);
        self.cond.notify_all();
    }
}

/// Waits for the record to be filled, ignoring interrupts. Returns the slot
/// and whether an interrupt was observed along the way.
fn wait_uninterruptibly<R>(record: &Arc<TaskRecord<R>>) -> (Slot<R>, bool)
where
    R: Send + 'static,
{
    let hook = Arc::clone(record);
    let _wake = interrupt::on_interrupt(Arc::new(move || {
        let _slot = hook.lock();
        hook.cond.notify_all();
    }));

    let mut interrupted = false;
    let mut slot = record.lock();
    loop {
        if interrupt::interrupted() {
            if !interrupted {
                tracing::debug!("interrupt absorbed while waiting for uninterruptible work");
            }
            interrupted = true;
        }
        if !matches!(*slot, Slot::Pending) {
            return (std::mem::replace(&mut *slot, Slot::Pending), interrupted);
        }
        slot = record.cond.wait(slot).unwrap_or_else(PoisonError::into_inner);
    }
}

/// Executor-side half of a [`TaskRecord`]; reports `Dropped` if the job is
/// discarded before it completes.
struct Completion<R> {
    record: Option<Arc<TaskRecord<R>>>,
}

impl<R> Completion<R> {
    fn finish(mut self, result: std::thread::Result<R>) {
        if let Some(record) = self.record.take() {
            record.store(Slot::Finished(result));
        }
    }
}

impl<R> Drop for Completion<R> {
    fn drop(&mut self) {
        if let Some(record) = self.record.take() {
            tracing::warn!("executor dropped uninterruptible work before running it");
            record.store(Slot::Dropped);
        }
    }
}

/// Runs `work` on the process-wide [`BlockingPool`] and blocks, ignoring
/// interrupts, until it finishes.
///
/// # Errors
///
/// [`Error::Execution`] if the global pool cannot be started or drops the
/// job. Never returns [`Error::Interrupted`].
pub fn run_uninterruptibly<F, R>(work: F) -> Result<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let pool = BlockingPool::global().map_err(Error::execution)?;
    run_uninterruptibly_on(pool, work)
}

/// [`run_uninterruptibly`] on a caller-chosen executor.
pub fn run_uninterruptibly_on<E, F, R>(executor: &E, work: F) -> Result<R>
where
    E: Executor + ?Sized,
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let record = Arc::new(TaskRecord::new());
    let completion = Completion {
        record: Some(Arc::clone(&record)),
    };

    // Submitted without holding the record lock so that executors running
    // jobs inline cannot deadlock against the waiter.
    executor.execute(Box::new(move || {
        let result = panic::catch_unwind(AssertUnwindSafe(work));
        completion.finish(result);
    }));

    let (slot, interrupted) = wait_uninterruptibly(&record);
    if interrupted {
        interrupt::current().interrupt();
    }

    match slot {
        Slot::Finished(Ok(value)) => Ok(value),
        Slot::Finished(Err(payload)) => {
            tracing::warn!("uninterruptible work panicked; resuming panic on caller");
            panic::resume_unwind(payload)
        }
        Slot::Dropped => Err(Error::execution(TaskRejected)),
        Slot::Pending => unreachable!("wait returned before completion"),
    }
}

/// Uninterruptible execution bound to a chosen executor.
#[derive(Debug, Clone)]
pub struct Uninterruptible<E> {
    executor: E,
}

impl<E: Executor> Uninterruptible<E> {
    pub fn on(executor: E) -> Self {
        Self { executor }
    }

    pub fn run<F, R>(&self, work: F) -> Result<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        run_uninterruptibly_on(&self.executor, work)
    }
}
