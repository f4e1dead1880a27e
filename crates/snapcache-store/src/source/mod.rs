//! Row sources
//!
//! A row source delivers raw rows for the tables of a plan registry. The
//! dump source routes statements in file order, so rows for one table may
//! arrive in several runs; the live source delivers each table in pages.

pub mod dump;
pub mod live;

pub use dump::DumpSource;
pub use live::LiveSource;

use crate::errors::{configuration, Result};
use snapcache_core::{PlanRegistry, RawRow, TablePlan};
use snapcache_core_types::Sensitive;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_MYSQL_HOST: &str = "localhost";
pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_MYSQL_DATABASE: &str = "clinicdb";

/// Callback receiving one run of raw rows for one table
pub type RowSink<'s> = dyn FnMut(&TablePlan, Vec<RawRow>) -> Result<()> + 's;

/// Producer of raw rows for the registry's tables
pub trait RowSource {
    /// Deliver every row for every registered table to `sink`
    ///
    /// # Errors
    ///
    /// Returns the first source or sink failure; nothing after it is read.
    fn stream(&mut self, plans: &PlanRegistry, sink: &mut RowSink<'_>) -> Result<()>;
}

/// Connection settings for a live MySQL source
#[derive(Clone, PartialEq)]
pub struct LiveSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Sensitive<String>,
    pub database: String,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_MYSQL_HOST.to_string(),
            port: DEFAULT_MYSQL_PORT,
            user: String::new(),
            password: Sensitive::default(),
            database: DEFAULT_MYSQL_DATABASE.to_string(),
        }
    }
}

impl LiveSettings {
    /// `mysql://host:port/database`, without credentials
    pub fn descriptor(&self) -> String {
        format!("mysql://{}:{}/{}", self.host, self.port, self.database)
    }
}

impl fmt::Debug for LiveSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password)
            .field("database", &self.database)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    Dump,
    Live,
}

impl SourceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMode::Dump => "backup",
            SourceMode::Live => "mysql",
        }
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a rebuild reads its rows from
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Dump(PathBuf),
    Live(LiveSettings),
}

impl DataSource {
    /// Build from optional parts; exactly one must be present
    ///
    /// # Errors
    ///
    /// Returns a Configuration error when both or neither are supplied.
    pub fn from_parts(dump: Option<PathBuf>, live: Option<LiveSettings>) -> Result<Self> {
        match (dump, live) {
            (Some(path), None) => Ok(DataSource::Dump(path)),
            (None, Some(settings)) => Ok(DataSource::Live(settings)),
            (Some(_), Some(_)) => Err(configuration(
                "Provide either a backup file or MySQL settings, not both",
            )),
            (None, None) => Err(configuration(
                "A backup file or MySQL settings must be supplied",
            )),
        }
    }

    pub fn mode(&self) -> SourceMode {
        match self {
            DataSource::Dump(_) => SourceMode::Dump,
            DataSource::Live(_) => SourceMode::Live,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapcache_core::ImportErrorKind;

    #[test]
    fn test_from_parts_requires_exactly_one() {
        let both = DataSource::from_parts(
            Some(PathBuf::from("dump.sql")),
            Some(LiveSettings::default()),
        );
        assert_eq!(both.unwrap_err().kind(), ImportErrorKind::Configuration);

        let neither = DataSource::from_parts(None, None);
        assert_eq!(neither.unwrap_err().kind(), ImportErrorKind::Configuration);

        let dump = DataSource::from_parts(Some(PathBuf::from("dump.sql")), None).unwrap();
        assert_eq!(dump.mode(), SourceMode::Dump);
    }

    #[test]
    fn test_live_defaults() {
        let settings = LiveSettings::default();
        assert_eq!(settings.descriptor(), "mysql://localhost:3306/clinicdb");
    }

    #[test]
    fn test_debug_redacts_password() {
        let settings = LiveSettings {
            password: Sensitive::new("hunter2".to_string()),
            ..LiveSettings::default()
        };
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("REDACTED"));
    }
}
