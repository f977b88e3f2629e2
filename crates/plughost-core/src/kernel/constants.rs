/// Application name
pub const APP_NAME: &str = "plughost";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Capability contract revision this host is built against.
/// Bump MAJOR for breaking changes, MINOR for additions, PATCH for fixes.
pub const CONTRACT_VERSION: &str = "2.0.0";

/// Oldest capability contract revision the host still accepts.
pub const MIN_SUPPORTED_CONTRACT_VERSION: &str = "2.0.0";

/// Name of the per-user (or per-project in debug mode) state directory
pub const BASE_DIR_NAME: &str = ".plughost";

/// Plugins directory, relative to the base directory
pub const PLUGINS_DIR: &str = "plugins";

/// Compiled artifacts, relative to the plugins directory
pub const BUILD_DIR: &str = "build";

/// Checked-out extension sources, relative to the plugins directory
pub const PKGS_DIR: &str = "pkgs";

/// Settings file stem looked up inside the base directory
pub const SETTINGS_FILE_STEM: &str = "config";

/// Default per-capability call timeout in seconds
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 5;

/// Default timeout for a source test run in seconds
pub const DEFAULT_SOURCE_TEST_TIMEOUT_SECS: u64 = 120;

/// Default timeout for building an extension in seconds
pub const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 120;
