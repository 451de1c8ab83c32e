//! exact-import: bulk XML import into Exact Online.
//!
//! Entry point: parses the command line, lays out the run directory,
//! initialises tracing, resolves configuration and hands a Chrome-backed
//! orchestrator the work.

mod cli;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use exact_import_browser::ChromeBrowser;
use exact_import_config::{Config, ConfigLoader, ConfigValidator};
use exact_import_core::{
    FileSessionStore, ImportError, RunArtifacts, RunPaths, RunReport, StdinPrompt, UploadOrchestrator,
};

use cli::{Cli, Commands, RunOptions};

/// Initialize tracing with console output and a daily-rolling file under `log_dir`.
fn init_tracing(log_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("exact-import")
        .filename_suffix("log")
        .max_log_files(30)
        .build(log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Dropping the guard stops the file writer.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> = std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()?;

    Ok(())
}

/// Configuration for this run: file and environment, then command-line overrides, validated.
fn load_config(path: Option<&Path>, options: &RunOptions) -> Result<Config, ImportError> {
    let mut config = ConfigLoader::resolve(path)?;
    if options.headless {
        config.browser.headless = true;
    }

    let warnings = ConfigValidator::validate(&config).into_result()?;
    for warning in warnings {
        warn!("{}: {}", warning.path, warning.message);
    }
    Ok(config)
}

fn print_report(report: &RunReport) {
    println!(
        "Uploaded {} document(s) in {} attempt(s).",
        report.documents.len(),
        report.attempts
    );
    for document in &report.documents {
        println!("  {:<40} {:>6} error row(s)", document.name, document.rows);
    }
    if report.summary.is_empty() {
        println!("No errors reported.");
    } else {
        println!("Error summary:\n{}", report.summary);
    }
    if let Some(csv) = &report.aggregate_csv {
        println!("Aggregate log: {}", csv.display());
    }
}

async fn run(cli: Cli, paths: RunPaths) -> Result<(), ImportError> {
    let options = cli.command.options();
    let config = Arc::new(load_config(cli.config.as_deref(), options)?);

    let browser = Arc::new(ChromeBrowser::from_config(&config, &paths.user_data_dir));
    let store = Arc::new(FileSessionStore::new(&paths.session_file));
    let orchestrator = UploadOrchestrator::new(
        config,
        browser,
        store,
        Arc::new(StdinPrompt),
        RunArtifacts::new(paths),
    )
    .with_otp_code(options.otp.clone());

    match &cli.command {
        Commands::Upload { directory, .. } => {
            info!("Importing documents from {}", directory.display());
            let report = orchestrator.run(directory).await?;
            print_report(&report);
        }
        Commands::Login { .. } => {
            orchestrator.login().await?;
            println!("Signed in; session saved.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let paths = RunPaths::new(&cli.command.options().tmp_dir, Utc::now());
    if let Err(e) = paths.ensure().await {
        eprintln!("Cannot prepare {}: {}", cli.command.options().tmp_dir.display(), e);
        return ExitCode::FAILURE;
    }
    if let Err(e) = init_tracing(&paths.logs_dir) {
        eprintln!("Failed to initialise logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Starting exact-import v{}", env!("CARGO_PKG_VERSION"));

    match run(cli, paths).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
