//! Runtime configuration.
//!
//! Settings are read from `scrumline.toml` and then overridden by
//! environment variables:
//!
//! ```toml
//! [storage]
//! backend = "sqlite"        # or "memory"
//! path = "scrumline.db"     # omit for an in-memory database
//! busy_timeout_ms = 5000
//!
//! [logging]
//! filter = "info"
//! json = false
//! ```

use crate::error::{Result, ScrumlineError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

impl std::str::FromStr for StorageBackend {
    type Err = ScrumlineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(ScrumlineError::ConfigError(format!(
                "unknown storage backend '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: if cfg!(feature = "sqlite-storage") {
                StorageBackend::Sqlite
            } else {
                StorageBackend::Memory
            },
            path: None,
            busy_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrumlineConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl ScrumlineConfig {
    const CONFIG_FILE: &'static str = "scrumline.toml";

    const ENV_BACKEND: &'static str = "SCRUMLINE_STORAGE_BACKEND";
    const ENV_DATABASE_PATH: &'static str = "SCRUMLINE_DATABASE_PATH";
    const ENV_LOG: &'static str = "SCRUMLINE_LOG";
    const ENV_LOG_JSON: &'static str = "SCRUMLINE_LOG_JSON";

    /// Loads configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScrumlineError::ConfigError(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ScrumlineError::ConfigError(format!("failed to parse config: {e}")))
    }

    /// Loads `scrumline.toml` from `dir`, falling back to defaults when absent
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let path = dir.join(Self::CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Applies overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(backend) = var(Self::ENV_BACKEND) {
            self.storage.backend = backend.parse()?;
        }
        if let Some(path) = var(Self::ENV_DATABASE_PATH) {
            self.storage.path = Some(PathBuf::from(path));
        }
        if let Some(filter) = var(Self::ENV_LOG) {
            self.logging.filter = filter;
        }
        if let Some(json) = var(Self::ENV_LOG_JSON) {
            self.logging.json = matches!(json.as_str(), "1" | "true" | "TRUE" | "yes");
        }
        Ok(())
    }
}
