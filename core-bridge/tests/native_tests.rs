//! Integration tests for core-bridge on native platforms.
//!
//! These tests drive the bridges from the outside, with producers running on
//! separate threads and the Tokio runtime.

use core_bridge::{
    callback::CallbackBridge, collect_blocking, complete_blocking, interrupt, run_blocking,
    run_no_result_blocking, run_uninterruptibly, run_uninterruptibly_on, single_blocking,
    suspend, Callback, Cancellable, CompletionEmitter, Executor, MaybeEmitter, OnError, OnValue,
    StreamEmitter,
};
use mockall::mock;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

mock! {
    pub Handle {}

    impl Cancellable for Handle {
        fn cancel(&self);
    }
}

mock! {
    pub Pool {}

    impl Executor for Pool {
        fn execute(&self, job: core_bridge::executor::Job);
    }
}

fn interrupt_after(delay: Duration) -> thread::JoinHandle<()> {
    let me = interrupt::current();
    thread::spawn(move || {
        thread::sleep(delay);
        me.interrupt();
    })
}

// ============================================================================
// Single-outcome bridge
// ============================================================================

#[test]
fn test_emits_one_two_three() {
    let values = collect_blocking(|emitter: StreamEmitter<i32>| {
        thread::spawn(move || {
            emitter.next(1);
            emitter.next(2);
            emitter.next(3);
            emitter.complete();
        });
    })
    .unwrap();
    assert_eq!(values, vec![1, 2, 3]);
}

#[test]
fn test_immediate_error_is_execution_failure() {
    let err = collect_blocking(|emitter: StreamEmitter<i32>| emitter.error("boom")).unwrap_err();
    assert!(err.is_execution());
    assert_eq!(err.cause().unwrap().to_string(), "boom");

    let err = single_blocking(|emitter: MaybeEmitter<i32>| emitter.error("boom")).unwrap_err();
    assert_eq!(err.cause().unwrap().to_string(), "boom");

    let err = complete_blocking(|emitter: CompletionEmitter| emitter.error("boom")).unwrap_err();
    assert_eq!(err.cause().unwrap().to_string(), "boom");
}

#[test]
fn test_interrupt_cancels_exactly_once() {
    interrupt::clear();
    let mut handle = MockHandle::new();
    handle.expect_cancel().times(1).return_const(());

    let helper = interrupt_after(Duration::from_millis(20));
    let err = single_blocking(move |_emitter: MaybeEmitter<u8>| handle).unwrap_err();

    assert!(err.is_interrupted());
    assert!(interrupt::is_interrupted());
    helper.join().unwrap();
    interrupt::clear();
}

#[test]
fn test_signal_after_interrupt_is_ignored() {
    interrupt::clear();
    let parked: Arc<Mutex<Option<StreamEmitter<u8>>>> = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&parked);

    let helper = interrupt_after(Duration::from_millis(20));
    let err = collect_blocking(move |emitter: StreamEmitter<u8>| {
        *slot.lock().unwrap() = Some(emitter);
    })
    .unwrap_err();
    assert!(err.is_interrupted());
    helper.join().unwrap();
    interrupt::clear();

    let emitter = parked.lock().unwrap().take().unwrap();
    assert!(emitter.is_closed());
    emitter.next(1);
    emitter.complete();
}

// ============================================================================
// Callback-style bridge
// ============================================================================

#[test]
fn test_silent_callback_producer_times_out() {
    let bridge = CallbackBridge::new(Duration::from_millis(50));

    let start = Instant::now();
    assert!(!bridge.run_no_result(|_done| {}).unwrap());
    let err = bridge.run(|_callback: Callback<u32>| {}).unwrap_err();
    assert!(err.is_timeout());
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_default_timeout_bridges() {
    let value = run_blocking(|callback: Callback<u32>| {
        thread::spawn(move || callback.call(11));
    })
    .unwrap();
    assert_eq!(value, 11);

    assert!(run_no_result_blocking(|done| {
        thread::spawn(move || done.call());
    })
    .unwrap());
}

// ============================================================================
// Uninterruptible executor
// ============================================================================

#[test]
fn test_uninterruptible_survives_interrupt() {
    interrupt::clear();
    let helper = interrupt_after(Duration::from_millis(10));
    let value = run_uninterruptibly(|| {
        thread::sleep(Duration::from_millis(100));
        "finished"
    })
    .unwrap();

    assert_eq!(value, "finished");
    assert!(interrupt::interrupted());
    helper.join().unwrap();
}

#[test]
fn test_custom_executor_receives_job() {
    let mut pool = MockPool::new();
    pool.expect_execute().times(1).returning(|job| job());

    assert_eq!(run_uninterruptibly_on(&pool, || 5 * 5).unwrap(), 25);
}

// ============================================================================
// Cooperative suspension
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_suspend_resumes_from_tokio_task() {
    let value = suspend(|on_value: OnValue<String>, _on_error: OnError<String>| {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            on_value.resume("resumed".to_string());
        })
    })
    .await
    .unwrap();
    assert_eq!(value, "resumed");
}
