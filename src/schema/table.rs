use crate::core::{Column, MigrateError, Result, Row, Schema, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    name: String,
    schema: Schema,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            schema: Schema::new(columns),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// A stored table: column catalog plus positional rows.
///
/// Rows are stored positionally, which is what makes column renames free:
/// renaming relabels one catalog entry and never touches a row. Rows may be
/// narrower than the catalog when columns were added after they were written;
/// reads pad the missing trailing values with the column's fill value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    schema: TableSchema,
    rows: BTreeMap<usize, Row>,
    next_row_id: usize,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
            next_row_id: 0,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn insert(&mut self, row: Row) -> Result<usize> {
        self.validate_row(&row)?;
        self.check_uniqueness(&row, None)?;

        let id = self.next_row_id;
        self.next_row_id += 1;
        self.rows.insert(id, row);
        Ok(id)
    }

    pub fn scan(&self) -> Vec<Row> {
        self.rows.values().map(|row| self.padded(row)).collect()
    }

    pub fn scan_with_ids(&self) -> Vec<(usize, Row)> {
        self.rows
            .iter()
            .map(|(id, row)| (*id, self.padded(row)))
            .collect()
    }

    pub fn get(&self, id: usize) -> Option<Row> {
        self.rows.get(&id).map(|row| self.padded(row))
    }

    /// Relabel a column. One catalog write; rows are positional and untouched,
    /// so every stored value stays visible under the new name.
    pub fn rename_column(&mut self, old: &str, new: &str) -> Result<()> {
        if self.schema.schema.find_column_index(new).is_some() {
            return Err(MigrateError::ColumnExists(
                new.to_string(),
                self.name().to_string(),
            ));
        }
        let idx = self.column_index(old)?;
        self.schema.schema.column_mut(idx).name = new.to_string();
        Ok(())
    }

    /// Add a column. Nullable adds touch only the catalog; existing rows are
    /// padded on read. A NOT NULL column requires a default and triggers an
    /// eager backfill pass over the stored rows.
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.schema.schema.find_column_index(&column.name).is_some() {
            return Err(MigrateError::ColumnExists(
                column.name.clone(),
                self.name().to_string(),
            ));
        }

        if !column.nullable {
            let default = column.default.clone().ok_or_else(|| {
                MigrateError::ConstraintViolation(format!(
                    "Cannot add NOT NULL column '{}' to table '{}' without a default",
                    column.name,
                    self.name()
                ))
            })?;
            let arity = self.schema.schema.column_count();
            let fills: Vec<_> = self
                .schema
                .schema
                .columns()
                .iter()
                .map(|col| col.fill_value())
                .collect();
            for row in self.rows.values_mut() {
                while row.len() < arity {
                    row.push(fills[row.len()].clone());
                }
                row.push(default.clone());
            }
        }

        self.schema.schema.push_column(column);
        Ok(())
    }

    /// Drop a column and excise its stored values. The values are gone for
    /// good; reversibility is decided at the operation level.
    pub fn remove_column(&mut self, name: &str) -> Result<Column> {
        let idx = self.column_index(name)?;
        let removed = self.schema.schema.remove_column(idx);
        for row in self.rows.values_mut() {
            if idx < row.len() {
                row.remove(idx);
            }
        }
        Ok(removed)
    }

    /// Replace a column definition after validating every visible value
    /// against the new constraints. Renames go through `rename_column`.
    pub fn alter_column(&mut self, name: &str, new: Column) -> Result<()> {
        if new.name != name {
            return Err(MigrateError::ConstraintViolation(format!(
                "AlterField cannot rename '{}' to '{}'; use RenameField",
                name, new.name
            )));
        }
        let idx = self.column_index(name)?;

        for row in self.rows.values() {
            let value = self.visible_value(row, idx);
            new.validate(&value)?;
        }

        if new.unique {
            let values: Vec<_> = self
                .rows
                .values()
                .map(|row| self.visible_value(row, idx))
                .filter(|v| !v.is_null())
                .collect();
            for (i, value) in values.iter().enumerate() {
                if values[i + 1..].contains(value) {
                    return Err(MigrateError::ConstraintViolation(format!(
                        "Cannot make column '{}' unique: duplicate value {}",
                        name, value
                    )));
                }
            }
        }

        *self.schema.schema.column_mut(idx) = new;
        Ok(())
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.schema.schema.find_column_index(name).ok_or_else(|| {
            MigrateError::ColumnNotFound(name.to_string(), self.name().to_string())
        })
    }

    fn padded(&self, row: &Row) -> Row {
        let mut padded = row.clone();
        let columns = self.schema.schema.columns();
        while padded.len() < columns.len() {
            padded.push(columns[padded.len()].fill_value());
        }
        padded
    }

    fn visible_value(&self, row: &Row, idx: usize) -> Value {
        row.get(idx)
            .cloned()
            .unwrap_or_else(|| self.schema.schema.columns()[idx].fill_value())
    }

    fn validate_row(&self, row: &Row) -> Result<()> {
        let columns = self.schema.schema.columns();
        if row.len() != columns.len() {
            return Err(MigrateError::ConstraintViolation(format!(
                "Table '{}' expects {} columns, got {}",
                self.name(),
                columns.len(),
                row.len()
            )));
        }
        for (column, value) in columns.iter().zip(row.iter()) {
            column.validate(value)?;
        }
        Ok(())
    }

    fn check_uniqueness(&self, row: &Row, ignore_id: Option<usize>) -> Result<()> {
        for (idx, column) in self.schema.schema.columns().iter().enumerate() {
            if !column.unique {
                continue;
            }
            let value = &row[idx];
            if value.is_null() {
                continue;
            }
            for (id, existing) in &self.rows {
                if Some(*id) == ignore_id {
                    continue;
                }
                if &self.visible_value(existing, idx) == value {
                    return Err(MigrateError::ConstraintViolation(format!(
                        "Unique constraint violation: column '{}' already contains value {}",
                        column.name, value
                    )));
                }
            }
        }
        Ok(())
    }
}
