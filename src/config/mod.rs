use crate::core::engine::{DirectionPolicy, RetryPolicy};
use crate::errors::{AppError, AppResult};
use crate::models::Channel;
use crate::utils::path::expand_tilde;
use crate::utils::time::parse_offset;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

/// Where a reader's samples come from.
///
/// `stdin` and `file:<path>` are line-oriented (keyboard-wedge readers,
/// FIFOs); `none` marks a reader that is configured but not connected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReaderConfig {
    pub channel: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: String,
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_write_attempts")]
    pub write_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default)]
    pub direction_policy: DirectionPolicy,
    #[serde(default = "default_sound")]
    pub sound: bool,
    #[serde(default = "default_readers")]
    pub readers: Vec<ReaderConfig>,
}

/// Keys every config file is expected to carry (used by `config --check`).
pub const CONFIG_KEYS: &[&str] = &[
    "database",
    "utc_offset",
    "poll_interval_ms",
    "write_attempts",
    "retry_backoff_ms",
    "busy_timeout_ms",
    "direction_policy",
    "sound",
    "readers",
];

fn default_utc_offset() -> String {
    "+09:00".to_string()
}
fn default_poll_interval_ms() -> u64 {
    500
}
fn default_write_attempts() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    500
}
fn default_busy_timeout_ms() -> u64 {
    250
}
fn default_sound() -> bool {
    true
}
fn default_readers() -> Vec<ReaderConfig> {
    vec![
        ReaderConfig {
            channel: Channel::CLASS.to_string(),
            source: "stdin".to_string(),
        },
        ReaderConfig {
            channel: Channel::MEETING.to_string(),
            source: "none".to_string(),
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self::with_database(Self::database_file())
    }
}

impl Config {
    fn with_database(db_path: PathBuf) -> Self {
        Self {
            database: db_path.to_string_lossy().to_string(),
            utc_offset: default_utc_offset(),
            poll_interval_ms: default_poll_interval_ms(),
            write_attempts: default_write_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            direction_policy: DirectionPolicy::default(),
            sound: default_sound(),
            readers: default_readers(),
        }
    }

    /// Return the standard configuration directory depending on the platform
    pub fn config_dir() -> PathBuf {
        if let Ok(dir) = env::var("KINTOUCH_HOME") {
            return PathBuf::from(dir);
        }
        if cfg!(target_os = "windows") {
            let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(appdata).join("kintouch")
        } else {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".kintouch")
        }
    }

    /// Return the full path of the config file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("kintouch.conf")
    }

    /// Return the full path of the SQLite database
    pub fn database_file() -> PathBuf {
        Self::config_dir().join("kintouch.sqlite")
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load() -> AppResult<Self> {
        let path = Self::config_file();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|_| AppError::ConfigLoad)?;
        let mut cfg: Config = serde_yaml::from_str(&content)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        cfg.database = expand_tilde(&cfg.database).to_string_lossy().to_string();
        Ok(cfg)
    }

    /// Keys from `CONFIG_KEYS` absent in the config file on disk.
    pub fn missing_keys() -> AppResult<Vec<&'static str>> {
        let content = fs::read_to_string(Self::config_file()).map_err(|_| AppError::ConfigLoad)?;
        let value: serde_yaml::Value =
            serde_yaml::from_str(&content).map_err(|e| AppError::Config(e.to_string()))?;

        Ok(CONFIG_KEYS
            .iter()
            .copied()
            .filter(|k| value.get(*k).is_none())
            .collect())
    }

    /// Initialize configuration and database files
    pub fn init_all(custom_db: Option<String>, is_test: bool) -> io::Result<PathBuf> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;

        // DB name: user provided or default
        let db_path = match custom_db {
            Some(name) => {
                let p = expand_tilde(&name);
                if p.is_absolute() { p } else { dir.join(p) }
            }
            None => Self::database_file(),
        };

        if !is_test {
            let config = Self::with_database(db_path.clone());
            let yaml = serde_yaml::to_string(&config).map_err(io::Error::other)?;
            let mut file = fs::File::create(Self::config_file())?;
            file.write_all(yaml.as_bytes())?;
        }

        Ok(db_path)
    }

    pub fn offset(&self) -> AppResult<FixedOffset> {
        parse_offset(&self.utc_offset)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.write_attempts.max(1),
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}
