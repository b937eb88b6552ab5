// mysqltool/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "config/settings.yml";
pub const CONFIG_PATH_ENV: &str = "MYSQL_TOOLS_CONFIG";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_SMTP_PORT: u16 = 25;
const DEFAULT_MAIL_FROM: &str = "root@localhost";

/// Settings file as written on disk. Everything is optional here; presence
/// is enforced by `ToolConfig::from_raw`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    pub bucket: Option<String>,
    pub folder: Option<String>,
    pub email: Option<String>,
    pub smtp_server: Option<String>,
    pub smtp_port: Option<u16>,
    pub mail_from: Option<String>,
    #[serde(rename = "AWS_ACCESS_KEY_ID")]
    pub aws_access_key_id: Option<String>,
    #[serde(rename = "AWS_SECRET_ACCESS_KEY")]
    pub aws_secret_access_key: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: Option<bool>,
    pub hostname: Option<String>,
    pub mysql_user: Option<String>,
    pub mysql_password: Option<String>,
    pub mysql_host: Option<String>,
    pub tmp_dir: Option<PathBuf>,
    pub lookback_days: Option<u32>,
    pub keep_local_files: Option<bool>,
    pub verbose: Option<bool>,
}

#[derive(Clone)]
pub struct StorageSettings {
    pub bucket: String,
    pub folder: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

// Credentials stay out of debug output.
impl fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSettings")
            .field("bucket", &self.bucket)
            .field("folder", &self.folder)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct MailSettings {
    pub email: String,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub from: String,
}

#[derive(Clone)]
pub struct MysqlSettings {
    pub user: String,
    pub password: Option<String>,
    pub host: Option<String>,
}

impl fmt::Debug for MysqlSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MysqlSettings")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub storage: StorageSettings,
    pub mail: MailSettings,
    pub mysql: MysqlSettings,
    pub hostname: String,
    pub tmp_dir: PathBuf,
    pub lookback_days: Option<u32>,
    pub keep_local_files: bool,
    pub verbose: bool,
}

/// Resolves the settings file location, honouring `MYSQL_TOOLS_CONFIG`.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

impl RawConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        Self::parse(&content, config_path)
    }

    /// `.json` files go through serde_json, anything else is read as YAML.
    pub fn parse(content: &str, config_path: &Path) -> Result<Self> {
        let is_json = config_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(content).with_context(|| {
                format!("Failed to parse JSON from config file at {}", config_path.display())
            })
        } else {
            // An empty YAML document deserializes to unit, not a map.
            if content.trim().is_empty() {
                return Ok(RawConfig::default());
            }
            serde_yaml::from_str(content).with_context(|| {
                format!("Failed to parse YAML from config file at {}", config_path.display())
            })
        }
    }
}

impl ToolConfig {
    /// Reads the file, fills secrets from the process environment and validates.
    pub fn load(config_path: &Path) -> Result<Self> {
        let raw = RawConfig::load(config_path)?;
        Ok(Self::from_raw(raw, |name| std::env::var(name).ok())?)
    }

    /// Validates a raw config. `env` is consulted for secrets the file omits.
    pub fn from_raw<F>(raw: RawConfig, env: F) -> std::result::Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let aws_access_key_id = raw.aws_access_key_id.or_else(|| env("AWS_ACCESS_KEY_ID"));
        let aws_secret_access_key = raw
            .aws_secret_access_key
            .or_else(|| env("AWS_SECRET_ACCESS_KEY"));
        let mysql_password = raw
            .mysql_password
            .or_else(|| env("MYSQL_PASSWORD"))
            .filter(|s| !s.is_empty());

        let bucket = required("bucket", raw.bucket)?;
        let folder = required("folder", raw.folder)?;
        let email = required("email", raw.email)?;
        let smtp_server = required("smtp_server", raw.smtp_server)?;
        let access_key_id = required("AWS_ACCESS_KEY_ID", aws_access_key_id)?;
        let secret_access_key = required("AWS_SECRET_ACCESS_KEY", aws_secret_access_key)?;
        let hostname = required("hostname", raw.hostname)?;
        let mysql_user = required("mysql_user", raw.mysql_user)?;

        let folder = folder.trim_matches('/').to_string();
        if folder.is_empty() {
            return Err(AppError::Config("'folder' cannot be only slashes".to_string()));
        }

        let endpoint_url = raw.endpoint_url.filter(|s| !s.trim().is_empty());
        if let Some(endpoint) = &endpoint_url {
            url::Url::parse(endpoint)
                .map_err(|e| AppError::Config(format!("invalid endpoint_url '{}': {}", endpoint, e)))?;
        }

        Ok(ToolConfig {
            storage: StorageSettings {
                bucket,
                folder,
                access_key_id,
                secret_access_key,
                region: raw
                    .region
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| DEFAULT_REGION.to_string()),
                endpoint_url,
                force_path_style: raw.force_path_style.unwrap_or(false),
            },
            mail: MailSettings {
                email,
                smtp_server,
                smtp_port: raw.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
                from: raw
                    .mail_from
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string()),
            },
            mysql: MysqlSettings {
                user: mysql_user,
                password: mysql_password,
                host: raw.mysql_host.filter(|s| !s.is_empty()),
            },
            hostname,
            tmp_dir: raw.tmp_dir.unwrap_or_else(std::env::temp_dir),
            lookback_days: raw.lookback_days,
            keep_local_files: raw.keep_local_files.unwrap_or(false),
            verbose: raw.verbose.unwrap_or(false),
        })
    }
}

fn required(name: &'static str, value: Option<String>) -> std::result::Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(AppError::MissingSetting(name))
}
