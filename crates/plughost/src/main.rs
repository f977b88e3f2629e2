mod cli;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// plughost: install, build and smoke-test capability extensions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Keep state in ./.plughost instead of ~/.plughost and log at debug level
    #[arg(long, global = true)]
    debug: bool,

    /// Settings file (json, yaml or toml); defaults to <base>/config.*
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Exercise compiled extensions and report per capability
    Test(cli::TestArgs),
    /// Clone a repository, check out a release and build it
    Install {
        /// <repo-url>[@<version>|@latest]
        spec: String,
        /// Install under this name instead of the repository name
        #[arg(long)]
        name: Option<String>,
        /// Access token for private https repositories
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// Build an extension from a local source directory
    InstallDir {
        dir: PathBuf,
        /// Install under this name instead of the directory name
        #[arg(long)]
        name: Option<String>,
    },
    /// Show metadata of an artifact, or of every artifact in a directory
    Meta { path: PathBuf },
    /// Print the host version and capability contract versions
    Version,
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let env = env_logger::Env::default().default_filter_or(default_level);
    if let Err(e) = env_logger::Builder::from_env(env).format_timestamp(None).try_init() {
        eprintln!("Failed to initialize logging: {}", e);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.debug);

    if let Commands::Version = args.command {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let host = match cli::HostContext::resolve(args.debug, args.config.as_deref()) {
        Ok(host) => host,
        Err(e) => {
            eprintln!("Failed to initialize plughost: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match args.command {
        Commands::Test(test_args) => cli::run_tests(&host, test_args).await,
        Commands::Install { spec, name, token } => {
            cli::install_repo(&host, &spec, name.as_deref(), token.as_deref()).await
        }
        Commands::InstallDir { dir, name } => cli::install_dir(&host, &dir, name.as_deref()).await,
        Commands::Meta { path } => cli::show_metadata(&path),
        Commands::Version => ExitCode::SUCCESS,
    }
}
