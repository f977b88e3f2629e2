#![cfg(test)]

use std::env::consts::DLL_EXTENSION;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::{TempDir, tempdir};

use crate::harness::discovery::DiscoverySources;
use crate::harness::invoker::{CancelSignal, InvocationOutcome};
use crate::harness::report::SourceTestOutcome;
use crate::harness::runner::{HarnessRunner, RunConfig, TestMode};
use crate::plugin_system::capabilities::Capability;
use crate::plugin_system::tests::fakes::{FakeCapabilities, FakeLoader, FakeToolchain};
use crate::storage::config::HostSettings;
use crate::storage::layout::PluginLayout;

fn artifact_dir(stems: &[&str]) -> TempDir {
    let dir = tempdir().unwrap();
    for stem in stems {
        std::fs::write(dir.path().join(format!("{}.{}", stem, DLL_EXTENSION)), b"").unwrap();
    }
    dir
}

fn config_for(dirs: &[&Path], base: &Path) -> RunConfig {
    let mut config = RunConfig::new(PluginLayout::new(base));
    config.call_timeout = Duration::from_secs(2);
    config.sources = DiscoverySources {
        search_dirs: dirs.iter().map(|d| d.to_path_buf()).collect(),
        ..DiscoverySources::default()
    };
    config
}

#[tokio::test]
async fn test_zero_artifacts_yield_empty_result() {
    let empty = tempdir().unwrap();
    let loader = Arc::new(FakeLoader::default());
    let runner = HarnessRunner::new(loader.clone(), Arc::new(FakeToolchain::default()));

    let result = runner.run(&config_for(&[empty.path()], empty.path())).await;

    assert!(result.plugins.is_empty());
    assert_eq!(result.failures, 0);
    assert!(loader.opened().is_empty());
}

#[tokio::test]
async fn test_duplicate_logical_names_are_tested_once() {
    let first = artifact_dir(&["alpha"]);
    let second = artifact_dir(&["alpha", "beta"]);
    let loader = Arc::new(
        FakeLoader::default()
            .with("alpha", FakeCapabilities::healthy("alpha"))
            .with("beta", FakeCapabilities::healthy("beta")),
    );
    let runner = HarnessRunner::new(loader.clone(), Arc::new(FakeToolchain::default()));

    let result = runner.run(&config_for(&[first.path(), second.path()], first.path())).await;

    let mut names: Vec<&str> = result.plugins.iter().map(|p| p.name.as_str()).collect();
    names.sort();
    assert_eq!(names, ["alpha", "beta"]);
    assert_eq!(loader.opened().len(), 2);
    assert_eq!(result.failures, 0);
    assert!(result.plugins.iter().all(|p| p.funcs.len() == 5));
}

#[tokio::test]
async fn test_legacy_health_only_artifact_passes() {
    let dir = artifact_dir(&["legacy"]);
    let loader = Arc::new(FakeLoader::default().with("legacy", FakeCapabilities::legacy_health_only("legacy")));
    let runner = HarnessRunner::new(loader, Arc::new(FakeToolchain::default()));

    let result = runner.run(&config_for(&[dir.path()], dir.path())).await;

    let outcomes: Vec<InvocationOutcome> = result.plugins[0].funcs.iter().map(|f| f.outcome.clone()).collect();
    assert_eq!(
        outcomes,
        [
            InvocationOutcome::Missing,
            InvocationOutcome::Ok,
            InvocationOutcome::Skipped,
            InvocationOutcome::Missing,
            InvocationOutcome::Missing,
        ]
    );
    assert_eq!(result.failures, 0);
}

#[tokio::test]
async fn test_open_failure_is_single_entry() {
    let dir = artifact_dir(&["corrupt"]);
    let runner = HarnessRunner::new(Arc::new(FakeLoader::default()), Arc::new(FakeToolchain::default()));

    let result = runner.run(&config_for(&[dir.path()], dir.path())).await;

    let report = &result.plugins[0];
    assert_eq!(report.funcs.len(), 1);
    assert_eq!(report.funcs[0].name, "Open");
    assert!(matches!(&report.funcs[0].outcome, InvocationOutcome::Error(msg) if msg.contains("not a loadable module")));
    assert_eq!(result.failures, 1);
}

#[tokio::test]
async fn test_hanging_capability_counts_one_failure() {
    let dir = artifact_dir(&["slow"]);
    let loader = Arc::new(
        FakeLoader::default().with("slow", FakeCapabilities::healthy("slow").hanging(Capability::Ledger, Duration::from_secs(3))),
    );
    let runner = HarnessRunner::new(loader, Arc::new(FakeToolchain::default()));
    let mut config = config_for(&[dir.path()], dir.path());
    config.call_timeout = Duration::from_millis(100);

    let result = runner.run(&config).await;

    assert_eq!(result.plugins[0].funcs[4].outcome, InvocationOutcome::Timeout);
    assert_eq!(result.failures, 1);
}

#[tokio::test]
async fn test_cancellation_completes_current_artifact_and_stops() {
    let dir = artifact_dir(&["a_first", "b_second"]);
    let loader = Arc::new(
        FakeLoader::default()
            .with("a_first", FakeCapabilities::healthy("a_first").hanging(Capability::Health, Duration::from_secs(3)))
            .with("b_second", FakeCapabilities::healthy("b_second")),
    );
    let (handle, signal) = CancelSignal::pair();
    let runner = HarnessRunner::new(loader.clone(), Arc::new(FakeToolchain::default())).with_cancel(signal);
    let mut config = config_for(&[dir.path()], dir.path());
    config.call_timeout = Duration::from_secs(10);

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();
    });
    let result = runner.run(&config).await;
    canceller.await.unwrap();

    assert_eq!(result.plugins.len(), 1);
    let funcs = &result.plugins[0].funcs;
    assert_eq!(funcs.len(), 5);
    assert_eq!(funcs[0].outcome, InvocationOutcome::Ok);
    assert!(funcs[1..].iter().all(|f| f.outcome == InvocationOutcome::Timeout));
    assert_eq!(loader.opened().len(), 1);
}

#[tokio::test]
async fn test_source_mode_runs_source_tests() {
    let artifacts = artifact_dir(&["withsrc", "nosrc"]);
    let base = tempdir().unwrap();
    let layout = PluginLayout::new(base.path());
    std::fs::create_dir_all(layout.package_dir("withsrc")).unwrap();

    let loader = Arc::new(
        FakeLoader::default()
            .with("withsrc", FakeCapabilities::healthy("withsrc"))
            .with("nosrc", FakeCapabilities::healthy("nosrc")),
    );
    let toolchain = Arc::new(FakeToolchain::failing("test checks::balance ... FAILED"));
    let runner = HarnessRunner::new(loader, toolchain.clone());
    let mut config = config_for(&[artifacts.path()], base.path());
    config.mode = TestMode::Source;

    let result = runner.run(&config).await;

    let by_name = |name: &str| result.plugins.iter().find(|p| p.name == name).unwrap();
    assert_eq!(
        by_name("withsrc").source_test.as_ref().unwrap().outcome,
        SourceTestOutcome::Error("test checks::balance ... FAILED".to_string())
    );
    assert_eq!(
        by_name("nosrc").source_test.as_ref().unwrap().outcome,
        SourceTestOutcome::Skipped("source dir not found".to_string())
    );
    assert_eq!(toolchain.tested(), vec![layout.package_dir("withsrc")]);
    assert_eq!(result.failures, 1);
}

#[tokio::test]
async fn test_smoke_mode_skips_source_tests() {
    let artifacts = artifact_dir(&["plain"]);
    let base = tempdir().unwrap();
    std::fs::create_dir_all(PluginLayout::new(base.path()).package_dir("plain")).unwrap();
    let toolchain = Arc::new(FakeToolchain::default());
    let runner = HarnessRunner::new(
        Arc::new(FakeLoader::default().with("plain", FakeCapabilities::healthy("plain"))),
        toolchain.clone(),
    );

    let result = runner.run(&config_for(&[artifacts.path()], base.path())).await;

    assert!(result.plugins[0].source_test.is_none());
    assert!(toolchain.tested().is_empty());
}

#[tokio::test]
async fn test_source_test_timeout_is_an_error() {
    let artifacts = artifact_dir(&["sluggish"]);
    let base = tempdir().unwrap();
    std::fs::create_dir_all(PluginLayout::new(base.path()).package_dir("sluggish")).unwrap();
    let toolchain = Arc::new(FakeToolchain { test_delay: Duration::from_secs(5), ..FakeToolchain::default() });
    let runner = HarnessRunner::new(
        Arc::new(FakeLoader::default().with("sluggish", FakeCapabilities::healthy("sluggish"))),
        toolchain,
    );
    let mut config = config_for(&[artifacts.path()], base.path());
    config.mode = TestMode::All;
    config.source_test_timeout = Duration::from_millis(100);

    let result = runner.run(&config).await;

    let outcome = &result.plugins[0].source_test.as_ref().unwrap().outcome;
    assert!(matches!(outcome, SourceTestOutcome::Error(msg) if msg.contains("timed out")));
    assert_eq!(result.failures, 1);
}

#[tokio::test]
async fn test_run_deadline_stops_before_next_artifact() {
    let dir = artifact_dir(&["a_slow", "b_never"]);
    let loader = Arc::new(
        FakeLoader::default()
            .with("a_slow", FakeCapabilities::healthy("a_slow").hanging(Capability::Meta, Duration::from_secs(3)))
            .with("b_never", FakeCapabilities::healthy("b_never")),
    );
    let runner = HarnessRunner::new(loader.clone(), Arc::new(FakeToolchain::default()));
    let mut config = config_for(&[dir.path()], dir.path());
    config.call_timeout = Duration::from_secs(10);
    config.run_timeout = Some(Duration::from_millis(100));

    let result = runner.run(&config).await;

    assert_eq!(result.plugins.len(), 1);
    assert_eq!(result.plugins[0].funcs[0].outcome, InvocationOutcome::Timeout);
    assert_eq!(loader.opened().len(), 1);
}

#[tokio::test]
async fn test_huge_timeouts_run_to_completion() {
    let artifacts = artifact_dir(&["patient"]);
    let base = tempdir().unwrap();
    std::fs::create_dir_all(PluginLayout::new(base.path()).package_dir("patient")).unwrap();
    let runner = HarnessRunner::new(
        Arc::new(FakeLoader::default().with("patient", FakeCapabilities::healthy("patient"))),
        Arc::new(FakeToolchain::default()),
    );
    let mut config = config_for(&[artifacts.path()], base.path());
    config.mode = TestMode::All;
    config.call_timeout = Duration::from_secs(u64::MAX);
    config.run_timeout = Some(Duration::from_secs(u64::MAX));
    config.source_test_timeout = Duration::from_secs(u64::MAX);

    let result = runner.run(&config).await;

    assert_eq!(result.plugins.len(), 1);
    assert_eq!(result.plugins[0].source_test.as_ref().unwrap().outcome, SourceTestOutcome::Ok);
    assert_eq!(result.failures, 0);
}

#[test]
fn test_mode_parsing_is_lenient() {
    assert_eq!(TestMode::parse_lenient("SOURCE"), TestMode::Source);
    assert_eq!(TestMode::parse_lenient("All"), TestMode::All);
    assert_eq!(TestMode::parse_lenient("smoke"), TestMode::Smoke);
    assert_eq!(TestMode::parse_lenient("everything"), TestMode::Smoke);
    assert!(TestMode::All.runs_source_tests());
    assert!(!TestMode::Smoke.runs_source_tests());
}

#[test]
fn test_config_from_settings() {
    let base = tempdir().unwrap();
    let layout = PluginLayout::new(base.path());
    let mut settings = HostSettings::default();
    settings.call_timeout_secs = 9;
    settings.run_timeout_secs = Some(60);
    settings.mode = TestMode::All;
    settings.credentials.insert("api_key".into(), "k".into());

    let config = RunConfig::from_settings(&settings, layout.clone());

    assert_eq!(config.call_timeout, Duration::from_secs(9));
    assert_eq!(config.run_timeout, Some(Duration::from_secs(60)));
    assert_eq!(config.mode, TestMode::All);
    assert_eq!(config.sources.build_dir, Some(layout.build_dir()));
    assert_eq!(config.inputs.credentials.get("api_key").map(String::as_str), Some("k"));
}
