use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("'{0}' is required and missing from the config")]
    MissingSetting(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    #[error("File [{0}] not found.")]
    BackupNotFound(String),

    #[error("Could not find any backups.")]
    NoBackups,

    #[error("Could not find a recent backup.")]
    NoRecentBackup,

    #[error("Invalid backup filename: '{0}'")]
    InvalidFilename(String),

    #[error("{program} exited with {status}: {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Backup failed, expected object at {key}")]
    BackupFailed { key: String },
}

impl AppError {
    /// Failures that should also print the usage text.
    pub fn wants_usage(&self) -> bool {
        matches!(self, AppError::UnknownAction(_))
    }
}
