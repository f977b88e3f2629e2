#![cfg(test)]

use std::time::Duration;

use tokio::time::Instant;

use crate::harness::invoker::{CancelSignal, InvocationOutcome, TimeoutInvoker, deadline_after};

fn invoker(per_call: Duration) -> TimeoutInvoker {
    TimeoutInvoker::new(per_call, CancelSignal::never())
}

#[tokio::test]
async fn test_successful_call_returns_value() {
    let invocation = invoker(Duration::from_secs(1)).invoke("Add", || Ok::<_, String>(2 + 2)).await;
    assert_eq!(invocation.outcome, InvocationOutcome::Ok);
    assert_eq!(invocation.value, Some(4));
}

#[tokio::test]
async fn test_error_is_recorded_with_message() {
    let invocation = invoker(Duration::from_secs(1))
        .invoke("Fail", || Err::<(), _>("bad credentials"))
        .await;
    assert_eq!(invocation.outcome, InvocationOutcome::Error("bad credentials".to_string()));
    assert!(invocation.value.is_none());
}

#[tokio::test]
async fn test_hanging_call_times_out_without_blocking() {
    let start = Instant::now();
    let invocation = invoker(Duration::from_millis(50))
        .invoke("Hang", || {
            std::thread::sleep(Duration::from_secs(3));
            Ok::<_, String>(())
        })
        .await;
    assert_eq!(invocation.outcome, InvocationOutcome::Timeout);
    assert!(start.elapsed() < Duration::from_secs(2), "invoker waited for the worker");
}

#[tokio::test]
async fn test_panic_becomes_error() {
    let invocation = invoker(Duration::from_secs(1))
        .invoke("Boom", || -> Result<(), String> { panic!("kaboom") })
        .await;
    assert_eq!(invocation.outcome, InvocationOutcome::Error("panic: kaboom".to_string()));
}

#[tokio::test]
async fn test_cancelled_run_returns_timeout_without_calling() {
    let (handle, signal) = CancelSignal::pair();
    handle.cancel();
    let called = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = called.clone();

    let invocation = TimeoutInvoker::new(Duration::from_secs(1), signal)
        .invoke("Skip", move || {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok::<_, String>(())
        })
        .await;

    assert_eq!(invocation.outcome, InvocationOutcome::Timeout);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!called.load(std::sync::atomic::Ordering::SeqCst));
}

#[tokio::test]
async fn test_cancellation_interrupts_in_flight_call() {
    let (handle, signal) = CancelSignal::pair();
    let invoker = TimeoutInvoker::new(Duration::from_secs(10), signal);

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    });
    let start = Instant::now();
    let invocation = invoker
        .invoke("Slow", || {
            std::thread::sleep(Duration::from_secs(3));
            Ok::<_, String>(())
        })
        .await;
    canceller.await.unwrap();

    assert_eq!(invocation.outcome, InvocationOutcome::Timeout);
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_run_deadline_caps_per_call_timeout() {
    let deadline = Instant::now() + Duration::from_millis(50);
    let invoker = invoker(Duration::from_secs(10)).with_run_deadline(Some(deadline));
    assert_eq!(invoker.deadline_for(Instant::now()), deadline);

    let invocation = invoker
        .invoke("Slow", || {
            std::thread::sleep(Duration::from_secs(3));
            Ok::<_, String>(())
        })
        .await;
    assert_eq!(invocation.outcome, InvocationOutcome::Timeout);
}

#[tokio::test]
async fn test_huge_timeout_does_not_overflow_the_deadline() {
    let huge = Duration::from_secs(u64::MAX);
    let start = Instant::now();
    assert!(deadline_after(start, huge) > start + Duration::from_secs(86_400));
    assert_eq!(deadline_after(start, Duration::from_secs(5)), start + Duration::from_secs(5));

    let invocation = invoker(huge).invoke("Meta", || Ok::<_, String>(1)).await;
    assert_eq!(invocation.outcome, InvocationOutcome::Ok);
    assert_eq!(invocation.value, Some(1));
}

#[tokio::test]
async fn test_never_signal_is_not_cancelled() {
    let signal = CancelSignal::never();
    assert!(!signal.is_cancelled());
    let waited = tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
    assert!(waited.is_err());
}

#[test]
fn test_outcome_classification() {
    assert!(!InvocationOutcome::Ok.is_failure());
    assert!(!InvocationOutcome::Missing.is_failure());
    assert!(!InvocationOutcome::Skipped.is_failure());
    assert!(InvocationOutcome::Timeout.is_failure());
    assert!(InvocationOutcome::Error("x".into()).is_failure());
    assert_eq!(InvocationOutcome::Error("x".into()).to_string(), "error: x");
    assert_eq!(InvocationOutcome::Timeout.to_string(), "timeout");
}
