// mysqltool/src/tool.rs
use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::ToolConfig;
use crate::errors::AppError;
use crate::notify::{self, Mailer};
use crate::storage::ObjectStore;
use crate::utils::process::CommandRunner;

pub type Clock = fn() -> NaiveDateTime;

pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Backup,
    Restore,
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "backup" => Ok(Action::Backup),
            "restore" => Ok(Action::Restore),
            other => Err(AppError::UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Backup => write!(f, "backup"),
            Action::Restore => write!(f, "restore"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Failure => write!(f, "failure"),
        }
    }
}

/// Positional arguments after the program name. The action stays a raw
/// string until dispatch so configuration is validated first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub action: String,
    pub database: String,
    pub extra: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliArgs {
    /// Nothing to do: print usage and exit cleanly.
    Usage,
    /// Too many arguments.
    Invalid,
    Run(Invocation),
}

pub fn parse_args(args: &[String]) -> CliArgs {
    match args {
        [] | [_] => CliArgs::Usage,
        [action, database] => CliArgs::Run(Invocation {
            action: action.clone(),
            database: database.clone(),
            extra: None,
        }),
        [action, database, extra] => CliArgs::Run(Invocation {
            action: action.clone(),
            database: database.clone(),
            extra: Some(extra.clone()),
        }),
        _ => CliArgs::Invalid,
    }
}

pub fn usage() -> String {
    let name = env!("CARGO_PKG_NAME");
    format!(
        "
    {name}
      - Uses config file ./{config} (override with ${env})

    USAGE:
    {name} backup <database>
      - does a mysqldump on localhost, gzips it and stores it in the configured bucket/folder

    {name} restore <database> [filename]
      - Must be run from the machine you wish to restore to.
      - gets the latest backup from the configured bucket/folder and imports it into <database>
      - takes an optional filename argument for a specific backup file in the configured bucket/folder
",
        name = name,
        config = crate::config::DEFAULT_CONFIG_PATH,
        env = crate::config::CONFIG_PATH_ENV,
    )
}

pub struct BackupRestoreTool {
    pub(crate) config: ToolConfig,
    pub(crate) store: Arc<dyn ObjectStore>,
    pub(crate) runner: Arc<dyn CommandRunner>,
    pub(crate) mailer: Arc<dyn Mailer>,
    pub(crate) clock: Clock,
}

impl BackupRestoreTool {
    pub fn new(
        config: ToolConfig,
        store: Arc<dyn ObjectStore>,
        runner: Arc<dyn CommandRunner>,
        mailer: Arc<dyn Mailer>,
        clock: Clock,
    ) -> Self {
        BackupRestoreTool {
            config,
            store,
            runner,
            mailer,
            clock,
        }
    }

    /// Dispatches one invocation. A failed backup is returned as an error so
    /// the process exits non-zero.
    pub async fn run(&self, invocation: &Invocation) -> Result<()> {
        let action: Action = invocation.action.parse()?;
        match action {
            Action::Backup => {
                if let Some(extra) = &invocation.extra {
                    tracing::warn!(argument = %extra, "backup ignores the extra argument");
                }
                let report = self.backup(&invocation.database).await;
                if report.outcome == Outcome::Failure {
                    return Err(AppError::BackupFailed { key: report.key }.into());
                }
            }
            Action::Restore => {
                self.restore(&invocation.database, invocation.extra.as_deref())
                    .await?;
            }
        }
        Ok(())
    }

    /// Mails the configured recipient about a failed action. Mail problems
    /// are printed and swallowed. Returns whether a send was attempted.
    pub(crate) async fn notify(
        &self,
        action: Action,
        outcome: Outcome,
        location: &str,
        cause: Option<&str>,
    ) -> bool {
        if outcome != Outcome::Failure {
            return false;
        }
        println!("Mailing...");
        let mail = &self.config.mail;
        let message = notify::compose(
            &mail.from,
            &mail.email,
            &action.to_string(),
            &outcome.to_string(),
            &self.config.hostname,
            location,
            (self.clock)(),
            cause,
        );
        if let Err(e) = self.mailer.send(&message).await {
            eprintln!(
                "ERROR: \n{:#}\nCould not connect to mail server on {}",
                e, mail.smtp_server
            );
            tracing::error!(error = %e, server = %mail.smtp_server, "failure notification not sent");
        }
        println!("Done.");
        true
    }
}
