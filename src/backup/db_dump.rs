// mysqltool/src/backup/db_dump.rs
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::config::MysqlSettings;
use crate::utils::process::{CommandRunner, CommandSpec};

pub const MYSQLDUMP: &str = "mysqldump";

/// Unique scratch path for one dump. Time alone is not enough when two
/// databases are dumped in the same second, so a random id is appended.
pub fn temp_dump_path(tmp_dir: &Path) -> PathBuf {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    tmp_dir.join(format!("db_backup_{}_{}.sql", secs, Uuid::new_v4().simple()))
}

/// Log file that receives mysqldump's verbose stderr.
pub fn dump_log_path(dump_path: &Path) -> PathBuf {
    let mut name = dump_path.as_os_str().to_owned();
    name.push(".result");
    PathBuf::from(name)
}

pub fn mysqldump_command(mysql: &MysqlSettings, database: &str, dump_path: &Path) -> CommandSpec {
    let mut spec = CommandSpec::new(MYSQLDUMP)
        .arg("-v")
        .arg("--quick")
        .arg("--single-transaction")
        .arg("-u")
        .arg(&mysql.user);
    if let Some(host) = &mysql.host {
        spec = spec.arg("-h").arg(host);
    }
    if let Some(password) = &mysql.password {
        spec = spec.env("MYSQL_PWD", password);
    }
    spec.arg(database)
        .stdout_to(dump_path)
        .stderr_to(dump_log_path(dump_path))
}

/// Dumps `database` into `dump_path`. A non-zero exit status is an error.
pub fn dump_database(
    runner: &dyn CommandRunner,
    mysql: &MysqlSettings,
    database: &str,
    dump_path: &Path,
) -> Result<()> {
    let spec = mysqldump_command(mysql, database, dump_path);
    let mut output = runner.run(&spec)?;

    let log = read_dump_log(&dump_log_path(dump_path));
    tracing::debug!(log = %log, "mysqldump output");

    // stderr went to the log file, so report its tail instead.
    if output.stderr.trim().is_empty() {
        output.stderr = log_tail(&log, 5);
    }
    output.check(MYSQLDUMP)?;
    Ok(())
}

/// The mysqldump log as text. Invalid UTF-8 is replaced rather than
/// discarding the whole log; a missing log reads as empty.
fn read_dump_log(log_path: &Path) -> String {
    std::fs::read(log_path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

fn log_tail(log: &str, lines: usize) -> String {
    let all: Vec<&str> = log.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
