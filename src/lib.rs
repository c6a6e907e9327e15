// ============================================================================
// MigraDB Library
// ============================================================================
//
// Embedded schema migration engine: an append-only history of migration
// steps, a dependency-ordered planner, and a transactional applier over a
// snapshot-persisted table store.

pub mod core;
pub mod facade;
pub mod migrate;
pub mod schema;

// Re-export main types for convenience
pub use core::{Column, DataType, MigrateError, Result, Row, Schema, Value};
pub use facade::{Migrator, MigratorConfig};
pub use migrate::{
    Applier, ApplyOutcome, MigrationStep, Operation, RevertOutcome, RunLock, StepId, StepRegistry,
    plan,
};
pub use schema::{
    DurabilityMode, JournalRecord, SchemaState, SchemaStore, Table, TableSchema,
};
