use crate::core::{MigrateError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    pid: u32,
    run_id: Uuid,
    acquired_at: DateTime<Utc>,
}

/// Advisory single-writer lock for a migration run.
///
/// A lock file created with `create_new` in the data directory; creation is
/// the atomic acquisition. Held for the whole run (acquire before planning,
/// release after the last step) and released on drop. Readers of the shared
/// state are never blocked by this lock.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    run_id: Uuid,
}

impl RunLock {
    pub fn acquire<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)
            .map_err(|e| MigrateError::IoError(format!("Failed to create data directory: {}", e)))?;
        let path = data_dir.join("migration.lock");

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let info = LockInfo {
                    pid: std::process::id(),
                    run_id: Uuid::new_v4(),
                    acquired_at: Utc::now(),
                };
                let body = serde_json::to_vec(&info)
                    .map_err(|e| MigrateError::IoError(format!("Failed to serialize lock info: {}", e)))?;
                file.write_all(&body)
                    .map_err(|e| MigrateError::IoError(format!("Failed to write lock file: {}", e)))?;
                Ok(Self {
                    path,
                    run_id: info.run_id,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path)
                    .ok()
                    .and_then(|body| serde_json::from_str::<LockInfo>(&body).ok())
                    .map(|info| format!("pid {} since {}", info.pid, info.acquired_at))
                    .unwrap_or_else(|| "unknown holder".to_string());
                Err(MigrateError::ConcurrentRunDetected { holder })
            }
            Err(e) => Err(MigrateError::IoError(format!(
                "Failed to create lock file: {}",
                e
            ))),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
