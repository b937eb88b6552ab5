// mysqltool/src/utils/process.rs
use anyhow::{Context, Result};
use std::fs::File;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::errors::AppError;
use crate::utils::find_executable;

/// A single external program invocation. Redirections point at files so
/// large dumps never pass through memory.
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub stdin: Option<PathBuf>,
    pub stdout: Option<PathBuf>,
    pub stderr: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: &str) -> Self {
        CommandSpec {
            program: program.to_string(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn stdin_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    pub fn stderr_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stderr = Some(path.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Turns a non-zero exit into `AppError::Command`.
    pub fn check(self, program: &str) -> std::result::Result<Self, AppError> {
        if self.success {
            return Ok(self);
        }
        Err(AppError::Command {
            program: program.to_string(),
            status: self
                .code
                .map(|c| format!("exit code {}", c))
                .unwrap_or_else(|| "a signal".to_string()),
            stderr: self.stderr.trim().to_string(),
        })
    }
}

pub trait CommandRunner: Send + Sync {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs programs on the local machine.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let program_path = find_executable(&spec.program)?;
        tracing::debug!(program = %program_path.display(), args = ?spec.args, "running command");

        let mut command = Command::new(&program_path);
        command.args(&spec.args);
        for (key, value) in &spec.env {
            command.env(key, value);
        }

        match &spec.stdin {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open stdin file: {}", path.display()))?;
                command.stdin(Stdio::from(file));
            }
            None => {
                command.stdin(Stdio::null());
            }
        }
        if let Some(path) = &spec.stdout {
            let file = File::create(path)
                .with_context(|| format!("Failed to create stdout file: {}", path.display()))?;
            command.stdout(Stdio::from(file));
        }
        if let Some(path) = &spec.stderr {
            let file = File::create(path)
                .with_context(|| format!("Failed to create stderr file: {}", path.display()))?;
            command.stderr(Stdio::from(file));
        }

        let output = command
            .output()
            .with_context(|| format!("Failed to execute {}", spec.program))?;

        Ok(CommandOutput {
            code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
