//! In-memory stand-ins for S3, the MySQL client tools and the mail relay.
use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::{RawConfig, ToolConfig};
use crate::notify::{Mailer, Notification};
use crate::storage::ObjectStore;
use crate::tool::BackupRestoreTool;
use crate::utils::process::{CommandOutput, CommandRunner, CommandSpec};

pub const DUMP_SQL: &str = "-- MySQL dump\nCREATE TABLE t (id int);\nINSERT INTO t VALUES (1),(2);\n";
const CHUNK_SIZE: usize = 7;

/// 2024-03-01 14:05
pub fn fixed_clock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(14, 5, 0))
        .expect("valid fixture time")
}

pub fn test_config(tmp_dir: &Path) -> ToolConfig {
    let raw = RawConfig {
        bucket: Some("b".to_string()),
        folder: Some("backups".to_string()),
        email: Some("a@x.com".to_string()),
        smtp_server: Some("mail".to_string()),
        aws_access_key_id: Some("k".to_string()),
        aws_secret_access_key: Some("s".to_string()),
        hostname: Some("h1".to_string()),
        mysql_user: Some("root".to_string()),
        tmp_dir: Some(tmp_dir.to_path_buf()),
        ..Default::default()
    };
    ToolConfig::from_raw(raw, |_| None).expect("fixture config is valid")
}

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    discard_uploads: bool,
    downloads: AtomicUsize,
    chunks_written: AtomicUsize,
}

impl MemoryStore {
    pub fn insert(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data);
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .map(|(_, key)| key.clone())
            .collect()
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn chunks_written(&self) -> usize {
        self.chunks_written.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_file(&self, bucket: &str, key: &str, file_path: &Path) -> Result<()> {
        let data = fs::read(file_path)?;
        if !self.discard_uploads {
            self.insert(bucket, key, data);
        }
        Ok(())
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        Ok(self.get(bucket, key).is_some())
    }

    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, key)| b == bucket && key.starts_with(prefix))
            .map(|(_, key)| key.clone())
            .collect())
    }

    async fn stream_to(
        &self,
        bucket: &str,
        key: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let data = self
            .get(bucket, key)
            .ok_or_else(|| anyhow::anyhow!("no such object: {}", key))?;
        for chunk in data.chunks(CHUNK_SIZE) {
            sink.write_all(chunk).await?;
            self.chunks_written.fetch_add(1, Ordering::SeqCst);
        }
        sink.flush().await?;
        Ok(data.len() as u64)
    }
}

/// Pretends to be mysqldump/mysql. Dumps write `DUMP_SQL`; imports record
/// whatever was fed on stdin.
#[derive(Default)]
pub struct FakeRunner {
    calls: Mutex<Vec<CommandSpec>>,
    imported: Mutex<Vec<String>>,
    exit_codes: HashMap<String, i32>,
}

impl FakeRunner {
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.program).collect()
    }

    pub fn imported(&self) -> Vec<String> {
        self.imported.lock().unwrap().clone()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(spec.clone());
        let code = self.exit_codes.get(&spec.program).copied().unwrap_or(0);

        if let Some(path) = &spec.stdin {
            self.imported.lock().unwrap().push(fs::read_to_string(path)?);
        }
        if let Some(path) = &spec.stdout {
            fs::write(path, if code == 0 { DUMP_SQL } else { "" })?;
        }
        if let Some(path) = &spec.stderr {
            let mut log = format!("-- {} connecting\n", spec.program);
            if code != 0 {
                log.push_str("Got error: 1049: Unknown database\n");
            }
            fs::write(path, log)?;
        }

        Ok(CommandOutput {
            code: Some(code),
            success: code == 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, notification: &Notification) -> Result<()> {
        if self.fail {
            anyhow::bail!("Connection refused (os error 111)");
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct Harness {
    pub tool: BackupRestoreTool,
    pub store: Arc<MemoryStore>,
    pub runner: Arc<FakeRunner>,
    pub mailer: Arc<RecordingMailer>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    /// Files left behind in the scratch directory.
    pub fn local_files(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.dir.path())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

#[derive(Default)]
pub struct HarnessBuilder {
    store: MemoryStore,
    runner: FakeRunner,
    mailer: RecordingMailer,
    tweaks: Vec<Box<dyn FnOnce(&mut ToolConfig)>>,
}

impl HarnessBuilder {
    pub fn discard_uploads(mut self) -> Self {
        self.store.discard_uploads = true;
        self
    }

    pub fn object(self, key: &str, data: Vec<u8>) -> Self {
        self.store.insert("b", key, data);
        self
    }

    pub fn exit_code(mut self, program: &str, code: i32) -> Self {
        self.runner.exit_codes.insert(program.to_string(), code);
        self
    }

    pub fn failing_mailer(mut self) -> Self {
        self.mailer.fail = true;
        self
    }

    pub fn config(mut self, tweak: impl FnOnce(&mut ToolConfig) + 'static) -> Self {
        self.tweaks.push(Box::new(tweak));
        self
    }

    pub fn build(self) -> Harness {
        let dir = tempfile::tempdir().expect("create scratch dir");
        let mut config = test_config(dir.path());
        for tweak in self.tweaks {
            tweak(&mut config);
        }
        let store = Arc::new(self.store);
        let runner = Arc::new(self.runner);
        let mailer = Arc::new(self.mailer);
        let tool = BackupRestoreTool::new(
            config,
            store.clone(),
            runner.clone(),
            mailer.clone(),
            fixed_clock,
        );
        Harness {
            tool,
            store,
            runner,
            mailer,
            dir,
        }
    }
}

/// Gzips `text` the same way a backup would.
pub fn gzipped(text: &str) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).expect("write to memory");
    encoder.finish().expect("finish gzip")
}

pub fn gunzipped(data: &[u8]) -> String {
    use std::io::Read;

    let mut text = String::new();
    flate2::read::GzDecoder::new(data)
        .read_to_string(&mut text)
        .expect("valid gzip");
    text
}
