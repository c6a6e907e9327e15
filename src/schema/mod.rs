pub mod persistence;
pub mod state;
pub mod table;

pub use persistence::{
    DurabilityMode, JournalRecord, MigrationJournal, SchemaStore, SnapshotManager, StateSnapshot,
};
pub use state::SchemaState;
pub use table::{Table, TableSchema};
