use crate::core::{MigrateError, Result, Row, Schema};
use crate::migrate::StepId;
use crate::schema::{Table, TableSchema};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// The materialized shape of every entity plus the set of applied steps.
///
/// Tables sit behind `Arc`, so cloning the whole state is shallow; a clone
/// serves as the transaction-local working copy during a step, and mutation
/// goes through `Arc::make_mut` (copy-on-write, per table). Only the applier
/// mutates this; everything else reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaState {
    tables: HashMap<String, Arc<Table>>,
    applied: BTreeSet<StepId>,
}

impl SchemaState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(&mut self, schema: TableSchema) -> Result<()> {
        let name = schema.name().to_string();
        if self.tables.contains_key(&name) {
            return Err(MigrateError::TableExists(name));
        }
        self.tables.insert(name, Arc::new(Table::new(schema)));
        Ok(())
    }

    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        if self.tables.remove(name).is_none() {
            return Err(MigrateError::TableNotFound(name.to_string()));
        }
        Ok(())
    }

    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .map(|t| t.as_ref())
            .ok_or_else(|| MigrateError::TableNotFound(name.to_string()))
    }

    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .map(Arc::make_mut)
            .ok_or_else(|| MigrateError::TableNotFound(name.to_string()))
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Current shape of an entity, for code/schema agreement checks.
    pub fn describe_table(&self, name: &str) -> Result<Schema> {
        Ok(self.table(name)?.schema().schema().clone())
    }

    pub fn insert_row(&mut self, table: &str, row: Row) -> Result<usize> {
        self.table_mut(table)?.insert(row)
    }

    pub fn scan_table(&self, table: &str) -> Result<Vec<Row>> {
        Ok(self.table(table)?.scan())
    }

    pub fn is_applied(&self, id: &StepId) -> bool {
        self.applied.contains(id)
    }

    pub fn applied_steps(&self) -> &BTreeSet<StepId> {
        &self.applied
    }

    pub(crate) fn mark_applied(&mut self, id: StepId) {
        self.applied.insert(id);
    }

    pub(crate) fn mark_reverted(&mut self, id: &StepId) {
        self.applied.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType, Value};

    #[test]
    fn test_create_and_drop_table() {
        let mut state = SchemaState::new();
        state
            .create_table(TableSchema::new(
                "product",
                vec![Column::new("id", DataType::Integer)],
            ))
            .unwrap();
        assert!(state.table_exists("product"));
        assert!(matches!(
            state
                .create_table(TableSchema::new("product", vec![]))
                .unwrap_err(),
            MigrateError::TableExists(_)
        ));

        state.drop_table("product").unwrap();
        assert!(matches!(
            state.drop_table("product").unwrap_err(),
            MigrateError::TableNotFound(_)
        ));
    }

    #[test]
    fn test_clone_is_isolated() {
        let mut state = SchemaState::new();
        state
            .create_table(TableSchema::new(
                "product",
                vec![Column::new("id", DataType::Integer)],
            ))
            .unwrap();
        state.insert_row("product", vec![Value::Integer(1)]).unwrap();

        let mut working = state.clone();
        working.insert_row("product", vec![Value::Integer(2)]).unwrap();
        working.mark_applied(StepId::new("store", "0001_initial"));

        // The original never sees the working copy's changes.
        assert_eq!(state.scan_table("product").unwrap().len(), 1);
        assert!(!state.is_applied(&StepId::new("store", "0001_initial")));
        assert_eq!(working.scan_table("product").unwrap().len(), 2);
    }

    #[test]
    fn test_applied_bookkeeping() {
        let mut state = SchemaState::new();
        let id = StepId::new("store", "0001_initial");
        assert!(!state.is_applied(&id));
        state.mark_applied(id.clone());
        assert!(state.is_applied(&id));
        state.mark_reverted(&id);
        assert!(!state.is_applied(&id));
    }
}
