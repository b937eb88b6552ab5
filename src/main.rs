//! MySQL Backup/Restore Tool
//!
//! Dumps a MySQL database into S3-compatible object storage and restores it
//! back, mailing the operator when a backup fails.

// mysqltool/src/main.rs
mod backup;
mod config;
mod errors;
mod notify;
mod restore;
mod storage;
mod tool;
mod utils;

#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use config::ToolConfig;
use errors::AppError;
use notify::SmtpMailer;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use storage::S3Store;
use tool::{BackupRestoreTool, CliArgs, Invocation};
use tracing_subscriber::EnvFilter;
use utils::process::SystemRunner;

/// Main entry point for the backup/restore tool
#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let invocation = match tool::parse_args(&args) {
        CliArgs::Usage => {
            println!("{}", tool::usage());
            return ExitCode::SUCCESS;
        }
        CliArgs::Invalid => {
            eprintln!("{}", tool::usage());
            return ExitCode::FAILURE;
        }
        CliArgs::Run(invocation) => invocation,
    };

    match run_app(&invocation).await {
        Ok(_) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            if e.downcast_ref::<AppError>().is_some_and(AppError::wants_usage) {
                println!("{}", tool::usage());
            }
            eprintln!("❌ Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Load config, connect to storage, then dispatch. Config problems stop the
/// run before anything external is touched.
async fn run_app(invocation: &Invocation) -> Result<()> {
    dotenv::dotenv().ok();

    let config_path = config::config_path();
    let config = ToolConfig::load(&config_path).with_context(|| {
        format!(
            "Failed to load application configuration from {}",
            config_path.display()
        )
    })?;
    init_tracing(config.verbose);
    tracing::debug!(config = ?config, "configuration loaded");

    let store = S3Store::connect(&config.storage).await;
    let mailer = SmtpMailer::new(&config.mail);
    let tool = BackupRestoreTool::new(
        config,
        Arc::new(store),
        Arc::new(SystemRunner),
        Arc::new(mailer),
        tool::local_now,
    );
    tool.run(invocation).await
}

/// `RUST_LOG` wins; otherwise `verbose` turns on this crate's debug output.
fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,{}={}", env!("CARGO_CRATE_NAME"), level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
