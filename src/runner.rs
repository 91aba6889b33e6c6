//! Launching valgrind with a resolved configuration.

use memcheck_config::Configuration;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use thiserror::Error;

/// Failures starting or waiting on the checker process.
#[derive(Debug, Error)]
pub enum RunError {
    /// The checker executable could not be started.
    #[error("failed to launch checker '{}': {source}", .checker.display())]
    Spawn {
        checker: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Build the checker command without running it.
pub fn checker_command<S: AsRef<str>>(config: &Configuration, args: &[S]) -> Command {
    let mut command = Command::new(config.valgrind());
    command.args(config.command_args(args));
    command
}

/// Run the checker to completion with inherited stdio.
pub fn run_checker<S: AsRef<str>>(config: &Configuration, args: &[S]) -> Result<ExitStatus, RunError> {
    log::info!("Running: {}", config.command(args));

    let status = checker_command(config, args)
        .status()
        .map_err(|source| RunError::Spawn {
            checker: config.valgrind().to_path_buf(),
            source,
        })?;

    if status.success() {
        log::info!("Checker exited successfully");
    } else {
        log::warn!("Checker exited with {status}");
    }
    Ok(status)
}
