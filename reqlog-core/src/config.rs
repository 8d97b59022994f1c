use crate::error::ReqLogError;
use figment::{Figment, providers::{Env, Format, Yaml}};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level reqlog configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReqLogConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub recorder: RecorderConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
}

/// Where the request log lives and how much of it is retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    /// Maximum number of entries kept after a rotation.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

/// Background recorder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Pending entries buffered before new ones are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_addr() -> String { "0.0.0.0:3000".into() }
fn default_log_dir() -> PathBuf { PathBuf::from("./logs") }
fn default_log_file() -> String { "log.csv".into() }
fn default_max_entries() -> usize { 20 }
fn default_queue_capacity() -> usize { 1024 }

// ── Impls ─────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: default_addr() }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            log_file: default_log_file(),
            max_entries: default_max_entries(),
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl StoreConfig {
    /// Full path of the CSV log file.
    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(&self.log_file)
    }
}

impl ReqLogConfig {
    /// Load configuration from YAML file + env overrides.
    ///
    /// Env keys nest with a double underscore, e.g. `REQLOG_STORE__MAX_ENTRIES`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: ReqLogConfig = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("REQLOG_").split("__"))
            .extract()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReqLogError> {
        if self.store.max_entries == 0 {
            return Err(ReqLogError::Config(
                "store.max_entries must be at least 1".into(),
            ));
        }
        if self.store.log_file.trim().is_empty() {
            return Err(ReqLogError::Config("store.log_file must not be empty".into()));
        }
        if self.recorder.queue_capacity == 0 {
            return Err(ReqLogError::Config(
                "recorder.queue_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
