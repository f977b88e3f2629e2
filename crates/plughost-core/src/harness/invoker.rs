use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::time::Instant;

use crate::plugin_system::loader::panic_message;

/// Classification of a single capability invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum InvocationOutcome {
    Ok,
    Missing,
    Error(String),
    Timeout,
    Skipped,
}

impl InvocationOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            InvocationOutcome::Ok => "ok",
            InvocationOutcome::Missing => "missing",
            InvocationOutcome::Error(_) => "error",
            InvocationOutcome::Timeout => "timeout",
            InvocationOutcome::Skipped => "skipped",
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            InvocationOutcome::Error(message) => Some(message),
            _ => None,
        }
    }

    /// `Ok`, `Missing` and `Skipped` never count as failures.
    pub fn is_failure(&self) -> bool {
        matches!(self, InvocationOutcome::Error(_) | InvocationOutcome::Timeout)
    }
}

impl fmt::Display for InvocationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error_message() {
            Some(message) => write!(f, "{}: {}", self.status(), message),
            None => f.write_str(self.status()),
        }
    }
}

/// Outcome of one bounded call, with the value when it succeeded.
#[derive(Debug, Clone)]
pub struct Invocation<T> {
    pub outcome: InvocationOutcome,
    pub value: Option<T>,
    pub elapsed: Duration,
}

impl<T> Invocation<T> {
    fn without_value(outcome: InvocationOutcome, elapsed: Duration) -> Self {
        Self { outcome, value: None, elapsed }
    }
}

/// Triggers cancellation of a run.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

/// Observes cancellation of a run. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Creates a linked handle/signal pair.
    pub fn pair() -> (CancelHandle, CancelSignal) {
        let (sender, receiver) = watch::channel(false);
        (CancelHandle { sender: Arc::new(sender) }, CancelSignal { receiver })
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, signal) = Self::pair();
        signal
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation has been requested. Pends forever when
    /// every handle has been dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}

/// Deadlines this far out never fire during a run.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `start + timeout`, clamped instead of overflowing for huge timeouts.
pub fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

/// Runs blocking calls on detached threads, bounded by a per-call timeout,
/// an optional run deadline and a cancellation signal.
///
/// A call that overruns is abandoned, not joined: its thread keeps running
/// in the background and its eventual result is discarded.
#[derive(Debug, Clone)]
pub struct TimeoutInvoker {
    per_call: Duration,
    run_deadline: Option<Instant>,
    cancel: CancelSignal,
}

impl TimeoutInvoker {
    pub fn new(per_call: Duration, cancel: CancelSignal) -> Self {
        Self { per_call, run_deadline: None, cancel }
    }

    pub fn with_run_deadline(mut self, run_deadline: Option<Instant>) -> Self {
        self.run_deadline = run_deadline;
        self
    }

    pub fn per_call(&self) -> Duration {
        self.per_call
    }

    pub fn run_deadline(&self) -> Option<Instant> {
        self.run_deadline
    }

    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    /// Earliest of `start + per_call` and the run deadline.
    pub fn deadline_for(&self, start: Instant) -> Instant {
        let call_deadline = deadline_after(start, self.per_call);
        match self.run_deadline {
            Some(run_deadline) => call_deadline.min(run_deadline),
            None => call_deadline,
        }
    }

    pub async fn invoke<T, E, F>(&self, name: &str, thunk: F) -> Invocation<T>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let start = Instant::now();
        if self.cancel.is_cancelled() {
            return Invocation::without_value(InvocationOutcome::Timeout, start.elapsed());
        }

        let (sender, receiver) = oneshot::channel();
        let spawned = std::thread::Builder::new()
            .name(format!("invoke-{}", name))
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(thunk));
                // The receiver is gone when the caller gave up on us.
                let _ = sender.send(result);
            });
        if let Err(e) = spawned {
            log::error!("Failed to spawn invocation thread for {}: {}", name, e);
            return Invocation::without_value(
                InvocationOutcome::Error(format!("failed to spawn invocation thread: {}", e)),
                start.elapsed(),
            );
        }

        let deadline = self.deadline_for(start);
        tokio::select! {
            biased;
            received = receiver => {
                let elapsed = start.elapsed();
                match received {
                    Ok(Ok(Ok(value))) => {
                        Invocation { outcome: InvocationOutcome::Ok, value: Some(value), elapsed }
                    }
                    Ok(Ok(Err(e))) => {
                        Invocation::without_value(InvocationOutcome::Error(e.to_string()), elapsed)
                    }
                    Ok(Err(panic_obj)) => {
                        let message = panic_message(panic_obj.as_ref());
                        log::error!("{} panicked: {}", name, message);
                        let outcome = InvocationOutcome::Error(format!("panic: {}", message));
                        Invocation::without_value(outcome, elapsed)
                    }
                    Err(_) => Invocation::without_value(
                        InvocationOutcome::Error(
                            "invocation thread exited without a result".to_string(),
                        ),
                        elapsed,
                    ),
                }
            }
            _ = self.cancel.cancelled() => {
                log::debug!("{} abandoned: run cancelled", name);
                Invocation::without_value(InvocationOutcome::Timeout, start.elapsed())
            }
            _ = tokio::time::sleep_until(deadline) => {
                log::warn!("{} timed out after {:?}", name, start.elapsed());
                Invocation::without_value(InvocationOutcome::Timeout, start.elapsed())
            }
        }
    }
}
