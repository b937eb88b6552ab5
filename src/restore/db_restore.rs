// mysqltool/src/restore/db_restore.rs
use anyhow::Result;
use std::path::Path;

use crate::config::MysqlSettings;
use crate::utils::process::{CommandRunner, CommandSpec};

pub const MYSQL: &str = "mysql";

pub fn mysql_import_command(mysql: &MysqlSettings, database: &str, sql_file_path: &Path) -> CommandSpec {
    let mut spec = CommandSpec::new(MYSQL).arg("-u").arg(&mysql.user);
    if let Some(host) = &mysql.host {
        spec = spec.arg("-h").arg(host);
    }
    if let Some(password) = &mysql.password {
        spec = spec.env("MYSQL_PWD", password);
    }
    spec.arg(database).stdin_from(sql_file_path)
}

/// Feeds a SQL file to the `mysql` client against `database`.
pub fn import_sql_file(
    runner: &dyn CommandRunner,
    mysql: &MysqlSettings,
    database: &str,
    sql_file_path: &Path,
) -> Result<()> {
    if !sql_file_path.exists() {
        return Err(anyhow::anyhow!(
            "SQL file for restoration not found: {}",
            sql_file_path.display()
        ));
    }

    let spec = mysql_import_command(mysql, database, sql_file_path);
    let output = runner.run(&spec)?.check(MYSQL)?;
    if !output.stdout.trim().is_empty() {
        tracing::debug!(stdout = %output.stdout.trim(), "mysql output");
    }
    println!(
        "✓ Imported {} into database {}",
        sql_file_path.display(),
        database
    );
    Ok(())
}
