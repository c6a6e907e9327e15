use crate::core::{MigrateError, Result};
use crate::schema::DurabilityMode;
use std::env;
use std::path::PathBuf;

/// Migrator configuration.
///
/// The data directory holds the schema snapshot, the migration journal, and
/// the run lock. The steps directory, when set, is the source-controlled
/// migration history (one JSON document per step).
#[derive(Debug, Clone)]
pub struct MigratorConfig {
    /// Directory for snapshot, journal, and lock files
    pub data_dir: PathBuf,

    /// Directory of step definition files; `None` means steps are registered
    /// in code
    pub steps_dir: Option<PathBuf>,

    /// Durability of step commits
    pub durability: DurabilityMode,
}

impl MigratorConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            steps_dir: None,
            durability: DurabilityMode::Sync,
        }
    }

    /// Set the steps directory
    pub fn steps_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.steps_dir = Some(dir.into());
        self
    }

    /// Set the durability mode
    pub fn durability(mut self, mode: DurabilityMode) -> Self {
        self.durability = mode;
        self
    }

    /// Build from the environment: `MIGRADB_DATA_DIR` (required) and
    /// `MIGRADB_STEPS_DIR` (optional).
    pub fn from_env() -> Result<Self> {
        let data_dir = env::var("MIGRADB_DATA_DIR").map_err(|_| {
            MigrateError::ParseError("MIGRADB_DATA_DIR is not set".to_string())
        })?;
        let mut config = Self::new(data_dir);
        if let Ok(steps_dir) = env::var("MIGRADB_STEPS_DIR") {
            config = config.steps_dir(steps_dir);
        }
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(MigrateError::ParseError(
                "data_dir cannot be empty".to_string(),
            ));
        }
        if let Some(steps_dir) = &self.steps_dir {
            if steps_dir.as_os_str().is_empty() {
                return Err(MigrateError::ParseError(
                    "steps_dir cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
