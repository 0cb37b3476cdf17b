//! cloudpush entry point.

mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use cloudpush_api::{Client, Session};
use cloudpush_config::{Config, DEFAULT_CONFIG_FILE, LoadOutcome};
use cloudpush_sync::{SyncOptions, SyncRun};

const DEFAULT_LOG_FILE: &str = "cloudpush.log";

/// Upload a local directory tree to Mail.ru Cloud.
#[derive(Debug, Parser)]
#[command(name = "cloudpush", version, about)]
struct Cli {
    /// Configuration file; created with defaults if missing.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log file, rotated at 5 MiB with two backups.
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Mirror log output to stderr.
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = match Config::load_or_create(&cli.config)? {
        LoadOutcome::Loaded(config) => config,
        LoadOutcome::Created(_) => {
            println!(
                "Created {}. Fill in your credentials and locations, then run again.",
                cli.config.display()
            );
            return Ok(ExitCode::FAILURE);
        }
    };
    config
        .validate()
        .with_context(|| format!("invalid configuration in {}", cli.config.display()))?;

    let _log_guard = logging::init(&cli.log_file, cli.verbose)
        .with_context(|| format!("cannot open log file {}", cli.log_file.display()))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "starting cloudpush"
    );

    let client = Client::new(&config.credentials.email)?;
    let session = match Session::establish(client, &config.credentials.password).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(login = %config.credentials.email, error = %e, "could not open cloud session");
            println!(
                "Could not log in to the cloud. See {} for details.",
                cli.log_file.display()
            );
            return Ok(ExitCode::FAILURE);
        }
    };

    let options =
        SyncOptions::from_config(&config).with_housekeeping(housekeeping(&cli.config, &cli.log_file));
    let report = SyncRun::new(options).run(&session).await?;

    println!("{}", report.summary_line(&cli.log_file));
    Ok(ExitCode::SUCCESS)
}

/// Files of the tool itself that must never be uploaded, should they sit
/// inside the upload root.
fn housekeeping(config: &Path, log_file: &Path) -> Vec<PathBuf> {
    let mut paths = vec![config.to_path_buf(), log_file.to_path_buf()];
    paths.extend(logging::backup_paths(log_file));
    if let Ok(exe) = std::env::current_exe() {
        paths.push(exe);
    }
    paths
}
