//! Cache settings
//!
//! Settings live in the `[database]` table of a TOML file:
//!
//! ```toml
//! [database]
//! source = "backup"            # or "mysql"
//! backup_path = "exports/clinic.sql"
//! cache_path = "data/clinic_cache.sqlite"
//! mysql_host = "localhost"
//! mysql_port = 3306
//! mysql_user = "reader"
//! mysql_password = "secret"
//! mysql_database = "clinicdb"
//! ```
//!
//! Relative paths are resolved against the settings file's directory. A
//! missing file yields defaults.

use crate::errors::{configuration, io_error, Result};
use crate::source::{
    DataSource, LiveSettings, DEFAULT_MYSQL_DATABASE, DEFAULT_MYSQL_HOST, DEFAULT_MYSQL_PORT,
};
use serde::Deserialize;
use snapcache_core_types::Sensitive;
use std::path::{Path, PathBuf};

pub const DEFAULT_CACHE_PATH: &str = "data/clinic_cache.sqlite";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub source: String,
    pub backup_path: String,
    pub cache_path: String,
    pub mysql_host: String,
    pub mysql_port: u16,
    pub mysql_user: String,
    pub mysql_password: Sensitive<String>,
    pub mysql_database: String,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            source: "mysql".to_string(),
            backup_path: String::new(),
            cache_path: DEFAULT_CACHE_PATH.to_string(),
            mysql_host: DEFAULT_MYSQL_HOST.to_string(),
            mysql_port: DEFAULT_MYSQL_PORT,
            mysql_user: String::new(),
            mysql_password: Sensitive::default(),
            mysql_database: DEFAULT_MYSQL_DATABASE.to_string(),
            base_dir: PathBuf::new(),
        }
    }
}

#[derive(Deserialize, Default)]
struct SettingsFile {
    #[serde(default)]
    database: CacheSettings,
}

impl CacheSettings {
    /// Load settings from `path`; a missing file yields defaults
    ///
    /// # Errors
    ///
    /// Returns an Io error if the file exists but cannot be read, and a
    /// Configuration error if it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut settings = if path.exists() {
            let text =
                std::fs::read_to_string(path).map_err(|e| io_error("read_settings", e))?;
            Self::from_toml_str(&text)?
        } else {
            tracing::debug!(path = %path.display(), "settings file not found; using defaults");
            Self::default()
        };
        settings.base_dir = base_dir;
        Ok(settings)
    }

    /// Parse the contents of a settings file
    ///
    /// # Errors
    ///
    /// Returns a Configuration error if the text is not valid settings TOML.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: SettingsFile = toml::from_str(text)
            .map_err(|e| configuration(format!("invalid settings: {}", e)))?;
        Ok(file.database)
    }

    pub fn resolve_cache_path(&self) -> PathBuf {
        self.resolve(&self.cache_path)
    }

    pub fn resolve_backup_path(&self) -> Option<PathBuf> {
        let trimmed = self.backup_path.trim();
        (!trimmed.is_empty()).then(|| self.resolve(trimmed))
    }

    /// Live settings with empty fields replaced by defaults
    pub fn live_settings(&self) -> LiveSettings {
        let or_default = |value: &str, default: &str| {
            if value.trim().is_empty() {
                default.to_string()
            } else {
                value.trim().to_string()
            }
        };
        LiveSettings {
            host: or_default(&self.mysql_host, DEFAULT_MYSQL_HOST),
            port: if self.mysql_port == 0 {
                DEFAULT_MYSQL_PORT
            } else {
                self.mysql_port
            },
            user: self.mysql_user.clone(),
            password: self.mysql_password.clone(),
            database: or_default(&self.mysql_database, DEFAULT_MYSQL_DATABASE),
        }
    }

    /// The data source these settings select
    ///
    /// # Errors
    ///
    /// Returns a Configuration error for an unknown `source`, or for
    /// `source = "backup"` without a `backup_path`.
    pub fn data_source(&self) -> Result<DataSource> {
        match self.source.trim().to_ascii_lowercase().as_str() {
            "backup" => {
                let path = self.resolve_backup_path().ok_or_else(|| {
                    configuration("source is \"backup\" but no backup_path is set")
                })?;
                DataSource::from_parts(Some(path), None)
            }
            "mysql" => DataSource::from_parts(None, Some(self.live_settings())),
            other => Err(configuration(format!(
                "unknown source \"{}\" (expected \"backup\" or \"mysql\")",
                other
            ))),
        }
    }

    fn resolve(&self, value: &str) -> PathBuf {
        let path = PathBuf::from(value);
        if path.is_absolute() {
            path
        } else {
            self.base_dir.join(path)
        }
    }
}
