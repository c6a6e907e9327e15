//! Snapshot and journal persistence for the schema store.
//!
//! Each step commit writes a full state snapshot atomically (temp file in the
//! same directory, then rename; the rename is the commit point) and appends a
//! record to the migration journal. The snapshot is authoritative on
//! recovery; the journal is the operator-facing audit trail.

use crate::core::{MigrateError, Result};
use crate::migrate::StepId;
use crate::schema::SchemaState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

// ============================================================================
// Durability Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// Every commit is synced to disk before it is acknowledged.
    #[default]
    Sync,
    /// Nothing touches disk; state lives only in memory (tests).
    None,
}

// ============================================================================
// State Snapshot
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub version: u32,
    pub state: SchemaState,
    pub metadata: SnapshotMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub created_at: DateTime<Utc>,
    pub table_count: usize,
    pub applied_count: usize,
}

impl StateSnapshot {
    pub fn new(state: SchemaState) -> Self {
        let metadata = SnapshotMetadata {
            created_at: Utc::now(),
            table_count: state.list_tables().len(),
            applied_count: state.applied_steps().len(),
        };
        Self {
            version: 1,
            state,
            metadata,
        }
    }
}

pub struct SnapshotManager {
    snapshot_path: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        }
    }

    pub fn save(&self, snapshot: &StateSnapshot) -> Result<()> {
        let dir = self.snapshot_path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir)
            .map_err(|e| MigrateError::IoError(format!("Failed to create snapshot directory: {}", e)))?;

        let serialized = rmp_serde::to_vec(snapshot)
            .map_err(|e| MigrateError::IoError(format!("Failed to serialize snapshot: {}", e)))?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| MigrateError::IoError(format!("Failed to create temp file: {}", e)))?;
        temp.write_all(&serialized)
            .map_err(|e| MigrateError::IoError(format!("Failed to write snapshot: {}", e)))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| MigrateError::IoError(format!("Failed to sync snapshot: {}", e)))?;
        temp.persist(&self.snapshot_path)
            .map_err(|e| MigrateError::IoError(format!("Failed to commit snapshot: {}", e)))?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<StateSnapshot>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let mut file = File::open(&self.snapshot_path)
            .map_err(|e| MigrateError::IoError(format!("Failed to open snapshot: {}", e)))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| MigrateError::IoError(format!("Failed to read snapshot: {}", e)))?;
        let snapshot: StateSnapshot = rmp_serde::from_slice(&data)
            .map_err(|e| MigrateError::IoError(format!("Failed to deserialize snapshot: {}", e)))?;
        Ok(Some(snapshot))
    }

    pub fn exists(&self) -> bool {
        self.snapshot_path.exists()
    }
}

// ============================================================================
// Migration Journal
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JournalRecord {
    Applied { step: StepId, at: DateTime<Utc> },
    Reverted { step: StepId, at: DateTime<Utc> },
}

impl JournalRecord {
    pub fn applied(step: StepId) -> Self {
        Self::Applied { step, at: Utc::now() }
    }

    pub fn reverted(step: StepId) -> Self {
        Self::Reverted { step, at: Utc::now() }
    }

    pub fn step(&self) -> &StepId {
        match self {
            Self::Applied { step, .. } | Self::Reverted { step, .. } => step,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Applied { at, .. } | Self::Reverted { at, .. } => *at,
        }
    }
}

pub struct MigrationJournal {
    journal_path: PathBuf,
    journal_file: Option<BufWriter<File>>,
    durability_mode: DurabilityMode,
}

impl MigrationJournal {
    pub fn new<P: AsRef<Path>>(journal_path: P, durability_mode: DurabilityMode) -> Result<Self> {
        let journal_path = journal_path.as_ref().to_path_buf();
        let journal_file = if durability_mode != DurabilityMode::None {
            if let Some(parent) = journal_path.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    MigrateError::IoError(format!("Failed to create journal directory: {}", e))
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&journal_path)
                .map_err(|e| MigrateError::IoError(format!("Failed to open journal: {}", e)))?;
            Some(BufWriter::new(file))
        } else {
            None
        };

        Ok(Self {
            journal_path,
            journal_file,
            durability_mode,
        })
    }

    pub fn append(&mut self, record: &JournalRecord) -> Result<()> {
        if self.durability_mode == DurabilityMode::None {
            return Ok(());
        }
        let file = self
            .journal_file
            .as_mut()
            .ok_or_else(|| MigrateError::IoError("Journal file not initialized".to_string()))?;
        let serialized = rmp_serde::to_vec(record)
            .map_err(|e| MigrateError::IoError(format!("Failed to serialize journal record: {}", e)))?;
        let len = serialized.len() as u32;
        file.write_all(&len.to_le_bytes())
            .map_err(|e| MigrateError::IoError(format!("Failed to write journal: {}", e)))?;
        file.write_all(&serialized)
            .map_err(|e| MigrateError::IoError(format!("Failed to write journal: {}", e)))?;
        file.flush()
            .map_err(|e| MigrateError::IoError(format!("Failed to flush journal: {}", e)))?;
        file.get_mut()
            .sync_all()
            .map_err(|e| MigrateError::IoError(format!("Failed to sync journal: {}", e)))?;
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<JournalRecord>> {
        if !self.journal_path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.journal_path)
            .map_err(|e| MigrateError::IoError(format!("Failed to open journal for reading: {}", e)))?;
        let mut reader = BufReader::new(file);
        let mut records = Vec::new();
        loop {
            let mut len_bytes = [0u8; 4];
            match reader.read_exact(&mut len_bytes) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => {
                    return Err(MigrateError::IoError(format!(
                        "Failed to read journal record length: {}",
                        e
                    )));
                }
            }
            let len = u32::from_le_bytes(len_bytes) as usize;
            let mut data = vec![0u8; len];
            reader
                .read_exact(&mut data)
                .map_err(|e| MigrateError::IoError(format!("Failed to read journal record: {}", e)))?;
            let record: JournalRecord = rmp_serde::from_slice(&data).map_err(|e| {
                MigrateError::IoError(format!("Failed to deserialize journal record: {}", e))
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

// ============================================================================
// Schema Store
// ============================================================================

/// Owns snapshot and journal; the applier's single point of durability.
pub struct SchemaStore {
    snapshot: SnapshotManager,
    journal: MigrationJournal,
    durability_mode: DurabilityMode,
}

impl SchemaStore {
    pub fn new<P: AsRef<Path>>(data_dir: P, durability_mode: DurabilityMode) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let snapshot = SnapshotManager::new(data_dir.join("schema.snapshot"));
        let journal = MigrationJournal::new(data_dir.join("migration.journal"), durability_mode)?;
        Ok(Self {
            snapshot,
            journal,
            durability_mode,
        })
    }

    /// Commit a step's outcome: snapshot first (the atomic rename is the
    /// transaction boundary), then the audit record.
    pub fn commit(&mut self, state: &SchemaState, record: JournalRecord) -> Result<()> {
        if self.durability_mode == DurabilityMode::None {
            return Ok(());
        }
        self.snapshot.save(&StateSnapshot::new(state.clone()))?;
        self.journal.append(&record)?;
        Ok(())
    }

    /// Persist the current state without a migration record (row seeding,
    /// maintenance writes).
    pub fn checkpoint(&mut self, state: &SchemaState) -> Result<()> {
        if self.durability_mode == DurabilityMode::None {
            return Ok(());
        }
        self.snapshot.save(&StateSnapshot::new(state.clone()))
    }

    /// Load the last committed state, if any.
    pub fn recover(&self) -> Result<Option<SchemaState>> {
        Ok(self.snapshot.load()?.map(|snapshot| snapshot.state))
    }

    pub fn history(&self) -> Result<Vec<JournalRecord>> {
        self.journal.read_all()
    }

    pub fn durability_mode(&self) -> DurabilityMode {
        self.durability_mode
    }
}
