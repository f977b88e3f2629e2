use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use log::{error, info, warn};
use serde::de::DeserializeOwned;

use plughost_core::harness::discovery::discover;
use plughost_core::harness::{CancelSignal, DiscoverySources, HarnessRunner, RunConfig, TestMode};
use plughost_core::install::{CargoToolchain, GitCli, InstallOutcome, InstallSpec, Installer};
use plughost_core::kernel::constants;
use plughost_core::plugin_system::loader::has_loader_extension;
use plughost_core::plugin_system::{LibraryLoader, PluginMetadata, read_metadata};
use plughost_core::storage::{HostSettings, PluginLayout};

/// Arguments of `plughost test`.
#[derive(Args, Debug)]
pub struct TestArgs {
    /// Artifact file or directory of artifacts; defaults to the build directories
    path: Option<PathBuf>,

    /// Per-capability call timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Bound on the whole run in seconds
    #[arg(long, value_name = "SECS")]
    run_timeout: Option<u64>,

    /// smoke, source or all
    #[arg(long)]
    mode: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Credentials as a JSON object
    #[arg(long, value_name = "JSON")]
    auth: Option<String>,

    /// Contact query parameters as JSON
    #[arg(long, value_name = "JSON")]
    contact_params: Option<String>,

    /// Ledger query parameters as JSON
    #[arg(long, value_name = "JSON")]
    ledger_params: Option<String>,
}

/// Layout and settings shared by every command.
#[derive(Debug, Clone)]
pub struct HostContext {
    pub layout: PluginLayout,
    pub settings: HostSettings,
}

impl HostContext {
    pub fn resolve(debug: bool, config: Option<&Path>) -> plughost_core::Result<Self> {
        let layout = PluginLayout::resolve(debug)?;
        let settings = HostSettings::resolve(config, layout.base_dir())?;
        Ok(Self { layout, settings })
    }

    fn toolchain(&self) -> CargoToolchain {
        CargoToolchain::new(self.settings.build_timeout())
    }

    fn installer(&self) -> Installer {
        Installer::new(self.layout.clone(), Arc::new(GitCli::default()), Arc::new(self.toolchain()))
    }
}

pub fn print_version() {
    println!("{} {}", constants::APP_NAME, constants::APP_VERSION);
    println!(
        "capability contract {} (min supported {})",
        constants::CONTRACT_VERSION,
        constants::MIN_SUPPORTED_CONTRACT_VERSION
    );
}

pub async fn run_tests(host: &HostContext, args: TestArgs) -> ExitCode {
    let mut config = RunConfig::from_settings(&host.settings, host.layout.clone());
    match sources_for(args.path.as_deref(), config.sources.build_dir.take()) {
        Ok(sources) => config.sources = sources,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    }

    if let Some(secs) = args.timeout {
        config.call_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = args.run_timeout {
        config.run_timeout = Some(Duration::from_secs(secs));
    }
    if let Some(mode) = &args.mode {
        config.mode = TestMode::parse_lenient(mode);
    }
    if let Some(credentials) = json_flag("auth", args.auth.as_deref()) {
        config.inputs.credentials = credentials;
    }
    if let Some(params) = json_flag("contact-params", args.contact_params.as_deref()) {
        config.inputs.contact_params = params;
    }
    if let Some(params) = json_flag("ledger-params", args.ledger_params.as_deref()) {
        config.inputs.ledger_params = params;
    }

    let (cancel_handle, cancel) = CancelSignal::pair();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing the current plugin");
            cancel_handle.cancel();
        }
    });

    let runner = HarnessRunner::new(Arc::new(LibraryLoader::new()), Arc::new(host.toolchain()))
        .with_cancel(cancel);
    info!("Running {} tests", config.mode);
    let result = runner.run(&config).await;
    interrupt.abort();

    if args.json {
        match result.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to encode results: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{}", result.render_human());
    }

    if result.failures > 0 { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

pub async fn install_repo(
    host: &HostContext,
    spec: &str,
    name: Option<&str>,
    token: Option<&str>,
) -> ExitCode {
    let spec = match InstallSpec::parse(spec) {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    match host.installer().install_repo(&spec, name, token).await {
        Ok(outcome) => {
            print_install(&outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Install failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

pub async fn install_dir(host: &HostContext, dir: &Path, name: Option<&str>) -> ExitCode {
    match host.installer().install_dir(dir, name).await {
        Ok(outcome) => {
            print_install(&outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Install failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

pub fn show_metadata(path: &Path) -> ExitCode {
    let sources = match sources_for(Some(path), None) {
        Ok(sources) => sources,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };
    let artifacts = discover(&sources);
    if artifacts.is_empty() {
        println!("No plugin artifacts found in {}", path.display());
        return ExitCode::SUCCESS;
    }

    let loader = LibraryLoader::new();
    let mut failed = false;
    println!("Plugins:");
    for artifact in &artifacts {
        match read_metadata(&loader, artifact) {
            Ok(metadata) => print_metadata(&artifact.path, &metadata),
            Err(e) => {
                error!("Failed to get metadata for {}: {}", artifact.path.display(), e);
                failed = true;
            }
        }
    }
    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

/// Turns the optional PATH argument into discovery sources. Without a path
/// the per-project and per-user build directories are searched, then
/// `fallback_build_dir`.
fn sources_for(
    path: Option<&Path>,
    fallback_build_dir: Option<PathBuf>,
) -> Result<DiscoverySources, String> {
    let Some(path) = path else {
        let mut search_dirs = vec![PluginLayout::new(constants::BASE_DIR_NAME).build_dir()];
        match PluginLayout::resolve(false) {
            Ok(user) => search_dirs.push(user.build_dir()),
            Err(e) => warn!("Could not resolve the home directory: {}", e),
        }
        return Ok(DiscoverySources {
            search_dirs,
            build_dir: fallback_build_dir,
            ..DiscoverySources::default()
        });
    };

    let metadata =
        std::fs::metadata(path).map_err(|_| format!("path not found: {}", path.display()))?;
    if metadata.is_dir() {
        return Ok(DiscoverySources {
            search_dirs: vec![path.to_path_buf()],
            ..DiscoverySources::default()
        });
    }
    if !has_loader_extension(path) {
        return Err(format!(
            "file must be a shared library (.{}): {}",
            std::env::consts::DLL_EXTENSION,
            path.display()
        ));
    }
    Ok(DiscoverySources { files: vec![path.to_path_buf()], ..DiscoverySources::default() })
}

/// Parses a JSON flag. Absent or blank flags yield `None`; invalid JSON is
/// reported and replaced by the empty value.
fn json_flag<T: DeserializeOwned + Default>(flag: &str, value: Option<&str>) -> Option<T> {
    let raw = value.map(str::trim).filter(|v| !v.is_empty())?;
    match serde_json::from_str(raw) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Invalid --{} JSON: {}", flag, e);
            Some(T::default())
        }
    }
}

fn print_install(outcome: &InstallOutcome) {
    match &outcome.tag {
        Some(tag) => println!("Installed '{}' at {} ({})", outcome.name, tag.name, tag.target),
        None => println!("Installed '{}' from a local directory", outcome.name),
    }
    println!("  source:   {}", outcome.source_dir.display());
    println!("  artifact: {}", outcome.artifact.display());
}

fn print_metadata(path: &Path, metadata: &PluginMetadata) {
    println!("  Plugin: {}", path.display());
    println!("    Name:        {}", metadata.name);
    println!("    Version:     {}", metadata.version);
    println!("    Author:      {}", metadata.author);
    println!("    Description: {}", metadata.description);
    println!("    Contract:    {}", metadata.contract_version);
}
