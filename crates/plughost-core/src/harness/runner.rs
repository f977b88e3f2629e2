use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::harness::discovery::{DiscoverySources, discover};
use crate::harness::invoker::{CancelSignal, InvocationOutcome, TimeoutInvoker, deadline_after};
use crate::harness::report::{ArtifactReport, CapabilityResult, RunResult};
use crate::harness::source_tests::run_source_tests;
use crate::install::toolchain::BuildToolchain;
use crate::kernel::constants;
use crate::plugin_system::contract::ContractGate;
use crate::plugin_system::dispatcher::{CapabilityDispatcher, DispatchInputs};
use crate::plugin_system::loader::{Artifact, ArtifactLoader};
use crate::storage::config::HostSettings;
use crate::storage::layout::PluginLayout;

/// Report entry name used when an artifact cannot be opened.
pub const OPEN_ENTRY: &str = "Open";

/// How much of an extension is exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TestMode {
    /// Capability checks only
    #[default]
    Smoke,
    /// Capability checks plus the extension's own source tests
    Source,
    All,
}

impl TestMode {
    /// Case-insensitive; anything unrecognised is `Smoke`.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "smoke" | "" => TestMode::Smoke,
            "source" => TestMode::Source,
            "all" => TestMode::All,
            other => {
                log::warn!("Unknown test mode '{}', using smoke", other);
                TestMode::Smoke
            }
        }
    }

    pub fn runs_source_tests(&self) -> bool {
        matches!(self, TestMode::Source | TestMode::All)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestMode::Smoke => "smoke",
            TestMode::Source => "source",
            TestMode::All => "all",
        }
    }
}

impl From<String> for TestMode {
    fn from(value: String) -> Self {
        TestMode::parse_lenient(&value)
    }
}

impl From<TestMode> for String {
    fn from(mode: TestMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a harness run needs, fixed for the duration of the run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub sources: DiscoverySources,
    /// Source checkouts for the source test step are looked up here
    pub layout: PluginLayout,
    pub mode: TestMode,
    pub call_timeout: Duration,
    /// Bound on the whole run; unbounded when `None`
    pub run_timeout: Option<Duration>,
    pub source_test_timeout: Duration,
    pub inputs: DispatchInputs,
}

impl RunConfig {
    pub fn new(layout: PluginLayout) -> Self {
        Self {
            sources: DiscoverySources::default(),
            layout,
            mode: TestMode::default(),
            call_timeout: Duration::from_secs(constants::DEFAULT_CALL_TIMEOUT_SECS),
            run_timeout: None,
            source_test_timeout: Duration::from_secs(constants::DEFAULT_SOURCE_TEST_TIMEOUT_SECS),
            inputs: DispatchInputs::default(),
        }
    }

    /// Defaults taken from the host settings. The build directory falls
    /// back to the layout's.
    pub fn from_settings(settings: &HostSettings, layout: PluginLayout) -> Self {
        let build_dir = settings.build_dir.clone().unwrap_or_else(|| layout.build_dir());
        Self {
            sources: DiscoverySources { build_dir: Some(build_dir), ..DiscoverySources::default() },
            layout,
            mode: settings.mode,
            call_timeout: settings.call_timeout(),
            run_timeout: settings.run_timeout(),
            source_test_timeout: settings.source_test_timeout(),
            inputs: DispatchInputs {
                credentials: settings.credentials.clone(),
                contact_params: settings.contact_params.clone(),
                ledger_params: settings.ledger_params.clone(),
            },
        }
    }
}

/// Discovers artifacts and exercises them one after another.
#[derive(Clone)]
pub struct HarnessRunner {
    loader: Arc<dyn ArtifactLoader>,
    toolchain: Arc<dyn BuildToolchain>,
    gate: ContractGate,
    cancel: CancelSignal,
}

impl fmt::Debug for HarnessRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarnessRunner")
            .field("gate", &self.gate)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl HarnessRunner {
    pub fn new(loader: Arc<dyn ArtifactLoader>, toolchain: Arc<dyn BuildToolchain>) -> Self {
        Self { loader, toolchain, gate: ContractGate::host(), cancel: CancelSignal::never() }
    }

    pub fn with_gate(mut self, gate: ContractGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs every discovered artifact. Stops early, returning what has been
    /// collected so far, once the run is cancelled or its deadline passes.
    pub async fn run(&self, config: &RunConfig) -> RunResult {
        let artifacts = discover(&config.sources);
        let run_deadline = config
            .run_timeout
            .map(|timeout| deadline_after(Instant::now(), timeout));
        let invoker = TimeoutInvoker::new(config.call_timeout, self.cancel.clone())
            .with_run_deadline(run_deadline);
        let dispatcher =
            CapabilityDispatcher::new(self.gate, Arc::new(config.inputs.clone()), invoker);

        let mut result = RunResult::default();
        for artifact in &artifacts {
            let untested = artifacts.len() - result.plugins.len();
            if self.cancel.is_cancelled() {
                log::warn!("Run cancelled; {} plugin(s) not tested", untested);
                break;
            }
            if run_deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                log::warn!("Run deadline reached; {} plugin(s) not tested", untested);
                break;
            }
            let report = self.test_artifact(artifact, &dispatcher, config, run_deadline).await;
            result.push(report);
        }
        result.recount();
        result
    }

    async fn test_artifact(
        &self,
        artifact: &Artifact,
        dispatcher: &CapabilityDispatcher,
        config: &RunConfig,
        run_deadline: Option<Instant>,
    ) -> ArtifactReport {
        let mut report = ArtifactReport::new(&artifact.logical_name, &artifact.path);

        let plugin = match self.loader.open(artifact) {
            Ok(plugin) => plugin,
            Err(e) => {
                log::error!("Failed to open {}: {}", artifact.path.display(), e);
                let outcome = InvocationOutcome::Error(e.to_string());
                report.funcs.push(CapabilityResult::instant(OPEN_ENTRY, outcome));
                return report;
            }
        };
        log::info!("Testing plugin '{}' ({} exports)", artifact.logical_name, plugin.tier());

        let outcome = dispatcher.dispatch(&plugin).await;
        report.funcs = outcome.funcs;
        if outcome.contract_rejected {
            return report;
        }

        if config.mode.runs_source_tests() {
            let source_dir = config.layout.package_dir(&artifact.logical_name);
            let source_test = run_source_tests(
                self.toolchain.as_ref(),
                &source_dir,
                config.source_test_timeout,
                run_deadline,
                &self.cancel,
            )
            .await;
            report.source_test = Some(source_test);
        }
        report
    }
}
