pub(crate) mod db_restore; // mysql import

use anyhow::{Context, Result};
use chrono::Days;

use crate::backup::archive;
use crate::errors::AppError;
use crate::tool::BackupRestoreTool;
use crate::utils::{keys, remove_local_files};
use std::path::Path;

impl BackupRestoreTool {
    /// Downloads a backup and imports it into `database`. Without a filename
    /// the most recent backup of `database` in the folder is used.
    pub async fn restore(&self, database: &str, filename: Option<&str>) -> Result<()> {
        let storage = &self.config.storage;

        // Explicit names are reduced to their base name. A key found by
        // listing keeps its path below the folder so dated keys resolve.
        let name = match filename {
            Some(given) => keys::base_name(given)
                .ok_or_else(|| AppError::InvalidFilename(given.to_string()))?
                .to_string(),
            None => {
                let latest = self.find_recent_backup(database).await?;
                keys::relative_to_folder(&latest, &storage.folder).to_string()
            }
        };
        let local_name = keys::base_name(&name)
            .ok_or_else(|| AppError::InvalidFilename(name.clone()))?;
        let archive_path = self.config.tmp_dir.join(local_name);
        let key = format!("{}/{}", storage.folder, name);

        println!("retrieving [{}] ...", name);
        if !self.store.exists(&storage.bucket, &key).await? {
            return Err(AppError::BackupNotFound(name).into());
        }

        let restored = self.download_and_import(database, &key, &archive_path).await;

        // The archive and the decompressed dump are removed whether or not
        // the import worked.
        if !self.config.keep_local_files {
            let sql_path = archive::gunzip_output_path(&archive_path);
            let mut paths = vec![archive_path.as_path()];
            paths.extend(sql_path.as_deref());
            remove_local_files(&paths);
        }
        restored?;

        println!("done.");
        Ok(())
    }

    async fn download_and_import(&self, database: &str, key: &str, archive_path: &Path) -> Result<()> {
        let mut file = tokio::fs::File::create(archive_path)
            .await
            .with_context(|| format!("Failed to create destination file: {}", archive_path.display()))?;
        let bytes = self
            .store
            .stream_to(&self.config.storage.bucket, key, &mut file)
            .await?;
        drop(file);
        tracing::debug!(key = %key, bytes, path = %archive_path.display(), "downloaded backup");

        println!("extracting...");
        let sql_path = archive::gunzip_in_place(archive_path)?;

        println!("importing...");
        db_restore::import_sql_file(self.runner.as_ref(), &self.config.mysql, database, &sql_path)
    }

    /// Newest backup of `database` under the folder, limited to the lookback
    /// window when one is configured. Other databases' keys and folder
    /// markers are skipped.
    pub async fn find_recent_backup(&self, database: &str) -> Result<String> {
        let storage = &self.config.storage;
        let listed: Vec<String> = self
            .store
            .list_keys(&storage.bucket, &keys::folder_prefix(&storage.folder))
            .await?
            .into_iter()
            .filter(|key| keys::is_backup_of(key, database))
            .collect();
        if listed.is_empty() {
            return Err(AppError::NoBackups.into());
        }

        let candidates = match self.config.lookback_days {
            Some(days) => {
                let today = (self.clock)().date();
                let cutoff = today
                    .checked_sub_days(Days::new(u64::from(days)))
                    .unwrap_or(today);
                listed
                    .into_iter()
                    .filter(|key| keys::within_lookback(key, cutoff))
                    .collect()
            }
            None => listed,
        };

        let latest = keys::latest_key(candidates).ok_or(AppError::NoRecentBackup)?;
        tracing::debug!(key = %latest, "selected most recent backup");
        Ok(latest)
    }
}
