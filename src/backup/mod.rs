pub(crate) mod archive; // gzip / gunzip of dump files
pub(crate) mod db_dump; // mysqldump invocation

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::tool::{Action, BackupRestoreTool, Outcome};
use crate::utils::{keys, remove_local_files};

/// What a backup run produced. `key` is the intended destination even when
/// the run failed before uploading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    pub key: String,
    pub outcome: Outcome,
    pub cause: Option<String>,
    pub notified: bool,
}

impl BackupRestoreTool {
    /// Dump, compress, upload and verify one database. Never fails outright:
    /// every problem ends up as a `failure` outcome and a notification.
    pub async fn backup(&self, database: &str) -> BackupReport {
        let dump_path = db_dump::temp_dump_path(&self.config.tmp_dir);
        tracing::debug!(dump_path = %dump_path.display(), database, "starting backup");

        let mut uploaded_key = None;
        let stored = self
            .export_and_store(database, &dump_path, &mut uploaded_key)
            .await;
        let key = uploaded_key.unwrap_or_else(|| {
            keys::backup_key(&self.config.storage.folder, database, (self.clock)())
        });

        let (outcome, cause) = match stored {
            Ok(()) => match self.store.exists(&self.config.storage.bucket, &key).await {
                Ok(true) => (Outcome::Success, None),
                Ok(false) => (
                    Outcome::Failure,
                    Some("object not found after upload".to_string()),
                ),
                Err(e) => (Outcome::Failure, Some(format!("{:#}", e))),
            },
            Err(e) => {
                eprintln!("❌ {:#}", e);
                (Outcome::Failure, Some(format!("{:#}", e)))
            }
        };
        tracing::info!(key = %key, outcome = %outcome, "backup finished");

        let notified = self
            .notify(Action::Backup, outcome, &key, cause.as_deref())
            .await;

        if !self.config.keep_local_files {
            let gz_path = with_suffix(&dump_path, ".gz");
            let log_path = db_dump::dump_log_path(&dump_path);
            remove_local_files(&[dump_path.as_path(), gz_path.as_path(), log_path.as_path()]);
        }

        println!("Done: {}", outcome);
        BackupReport {
            key,
            outcome,
            cause,
            notified,
        }
    }

    async fn export_and_store(
        &self,
        database: &str,
        dump_path: &Path,
        uploaded_key: &mut Option<String>,
    ) -> Result<()> {
        println!("Exporting...");
        db_dump::dump_database(self.runner.as_ref(), &self.config.mysql, database, dump_path)?;

        println!("Compressing...");
        let gz_path = archive::gzip_in_place(dump_path)?;

        println!("Storing...");
        let key = uploaded_key.insert(keys::backup_key(
            &self.config.storage.folder,
            database,
            (self.clock)(),
        ));
        self.store
            .put_file(&self.config.storage.bucket, key.as_str(), &gz_path)
            .await
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
