//! # plughost Test Harness
//!
//! Exercises compiled extensions and reports on them.
//!
//! - **[`discovery`]**: Finds artifact files and deduplicates them by
//!   logical name.
//! - **[`invoker`]**: [`TimeoutInvoker`](invoker::TimeoutInvoker) runs one
//!   capability call on a detached thread under a timeout, and
//!   [`CancelSignal`](invoker::CancelSignal) carries run cancellation.
//! - **[`report`]**: Per-artifact and per-run results, JSON and human output.
//! - **[`runner`]**: [`HarnessRunner`] drives a whole run from a [`RunConfig`].
//! - **[`source_tests`]**: Runs an extension's own test suite from source.
pub mod discovery;
pub mod invoker;
pub mod report;
pub mod runner;

pub use discovery::DiscoverySources;
pub use invoker::{CancelHandle, CancelSignal, Invocation, InvocationOutcome, TimeoutInvoker};
pub use report::{ArtifactReport, CapabilityResult, RunResult, SourceTestOutcome, SourceTestResult};
pub use runner::{HarnessRunner, RunConfig, TestMode};

#[cfg(test)]
mod tests;
