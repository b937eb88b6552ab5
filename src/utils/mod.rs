pub mod keys;
pub mod process;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use which::which;

/// Finds a MySQL client executable in the system PATH.
pub fn find_executable(program: &str) -> Result<PathBuf> {
    which(program).with_context(|| {
        format!(
            "{} executable not found in PATH. Please ensure the MySQL client tools are installed and in your PATH.",
            program
        )
    })
}

/// Best-effort removal of local scratch files once an operation has finished.
pub fn remove_local_files(paths: &[&Path]) {
    for path in paths {
        if !path.exists() {
            continue;
        }
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed local file"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove local file"),
        }
    }
}
