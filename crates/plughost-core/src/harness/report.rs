use std::fmt::{self, Write as _};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::harness::invoker::InvocationOutcome;

/// Outcome of one capability in an artifact report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityResult {
    pub name: String,
    #[serde(flatten)]
    pub outcome: InvocationOutcome,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl CapabilityResult {
    pub fn new(name: impl Into<String>, outcome: InvocationOutcome, elapsed: Duration) -> Self {
        Self { name: name.into(), outcome, elapsed }
    }

    /// Result for a capability that was never invoked.
    pub fn instant(name: impl Into<String>, outcome: InvocationOutcome) -> Self {
        Self::new(name, outcome, Duration::ZERO)
    }
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

/// Outcome of running an extension's own source tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum SourceTestOutcome {
    Ok,
    /// Captured test output or the reason the run failed
    Error(String),
    Skipped(String),
}

impl SourceTestOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            SourceTestOutcome::Ok => "ok",
            SourceTestOutcome::Error(_) => "error",
            SourceTestOutcome::Skipped(_) => "skipped",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SourceTestOutcome::Error(_))
    }
}

impl fmt::Display for SourceTestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceTestOutcome::Ok => f.write_str(self.status()),
            SourceTestOutcome::Error(detail) | SourceTestOutcome::Skipped(detail) => {
                write!(f, "{}: {}", self.status(), detail)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceTestResult {
    pub name: String,
    #[serde(flatten)]
    pub outcome: SourceTestOutcome,
}

/// Everything recorded for one artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactReport {
    pub name: String,
    pub file: PathBuf,
    pub funcs: Vec<CapabilityResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_test: Option<SourceTestResult>,
}

impl ArtifactReport {
    pub fn new(name: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), file: file.into(), funcs: Vec::new(), source_test: None }
    }

    pub fn failure_count(&self) -> usize {
        let capability_failures = self.funcs.iter().filter(|f| f.outcome.is_failure()).count();
        let source_failures = self
            .source_test
            .as_ref()
            .map_or(0, |st| usize::from(st.outcome.is_failure()));
        capability_failures + source_failures
    }
}

/// Aggregate of a harness run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunResult {
    pub plugins: Vec<ArtifactReport>,
    pub failures: usize,
}

impl RunResult {
    pub fn push(&mut self, report: ArtifactReport) {
        self.plugins.push(report);
        self.recount();
    }

    /// Recomputes `failures` from every recorded outcome.
    pub fn recount(&mut self) {
        self.failures = self.plugins.iter().map(ArtifactReport::failure_count).sum();
    }

    pub fn passed(&self) -> bool {
        self.failures == 0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_human(&self) -> String {
        let mut out = String::new();
        if self.plugins.is_empty() {
            out.push_str("No plugins tested.\n");
            return out;
        }
        for plugin in &self.plugins {
            let _ = writeln!(out, "Plugin: {} ({})", plugin.name, plugin.file.display());
            for func in &plugin.funcs {
                let _ = writeln!(out, "  - {}: {} ({:?})", func.name, func.outcome, func.elapsed);
            }
            if let Some(source_test) = &plugin.source_test {
                let _ = writeln!(out, "  - {}: {}", source_test.name, source_test.outcome);
            }
        }
        if self.failures > 0 {
            let _ = writeln!(out, "Failures: {}", self.failures);
        } else {
            out.push_str("All tests passed\n");
        }
        out
    }
}
