use crate::core::{Column, Result};
use crate::schema::{SchemaState, TableSchema};
use serde::{Deserialize, Serialize};

/// A single schema change. Each variant carries enough data to execute it
/// and, where an inverse is defined, to reverse it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    CreateTable { table: String, columns: Vec<Column> },
    DropTable { table: String },
    AddField { table: String, column: Column },
    /// Carries the full column definition so the drop can be reversed
    /// (the shape, not the excised values).
    RemoveField { table: String, column: Column },
    RenameField { table: String, from: String, to: String },
    AlterField { table: String, from: Column, to: Column },
}

impl Operation {
    /// Short human-readable form, used in error payloads and logs.
    pub fn describe(&self) -> String {
        match self {
            Self::CreateTable { table, .. } => format!("create_table {}", table),
            Self::DropTable { table } => format!("drop_table {}", table),
            Self::AddField { table, column } => {
                format!("add_field {}.{}", table, column.name)
            }
            Self::RemoveField { table, column } => {
                format!("remove_field {}.{}", table, column.name)
            }
            Self::RenameField { table, from, to } => {
                format!("rename_field {}.{} -> {}", table, from, to)
            }
            Self::AlterField { table, to, .. } => {
                format!("alter_field {}.{}", table, to.name)
            }
        }
    }

    pub fn apply(&self, state: &mut SchemaState) -> Result<()> {
        match self {
            Self::CreateTable { table, columns } => {
                state.create_table(TableSchema::new(table.clone(), columns.clone()))
            }
            Self::DropTable { table } => state.drop_table(table),
            Self::AddField { table, column } => {
                state.table_mut(table)?.add_column(column.clone())
            }
            Self::RemoveField { table, column } => {
                state.table_mut(table)?.remove_column(&column.name)?;
                Ok(())
            }
            Self::RenameField { table, from, to } => {
                state.table_mut(table)?.rename_column(from, to)
            }
            Self::AlterField { table, to, .. } => {
                state.table_mut(table)?.alter_column(&to.name, to.clone())
            }
        }
    }

    /// The operation that undoes this one, or `None` when no inverse exists.
    ///
    /// `DropTable` is never reversible (the rows are gone). `RemoveField` is
    /// reversible only when the column can be re-added without the lost
    /// values, i.e. it is nullable or carries a default.
    pub fn inverse(&self) -> Option<Operation> {
        match self {
            Self::CreateTable { table, .. } => Some(Self::DropTable {
                table: table.clone(),
            }),
            Self::DropTable { .. } => None,
            Self::AddField { table, column } => Some(Self::RemoveField {
                table: table.clone(),
                column: column.clone(),
            }),
            Self::RemoveField { table, column } => {
                if column.nullable || column.default.is_some() {
                    Some(Self::AddField {
                        table: table.clone(),
                        column: column.clone(),
                    })
                } else {
                    None
                }
            }
            Self::RenameField { table, from, to } => Some(Self::RenameField {
                table: table.clone(),
                from: to.clone(),
                to: from.clone(),
            }),
            Self::AlterField { table, from, to } => Some(Self::AlterField {
                table: table.clone(),
                from: to.clone(),
                to: from.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataType;

    #[test]
    fn test_rename_inverse_is_mirrored() {
        let op = Operation::RenameField {
            table: "color".into(),
            from: "color_name".into(),
            to: "name".into(),
        };
        match op.inverse().unwrap() {
            Operation::RenameField { from, to, .. } => {
                assert_eq!(from, "name");
                assert_eq!(to, "color_name");
            }
            other => panic!("unexpected inverse: {:?}", other),
        }
    }

    #[test]
    fn test_drop_table_has_no_inverse() {
        let op = Operation::DropTable { table: "product".into() };
        assert!(op.inverse().is_none());
    }

    #[test]
    fn test_remove_not_null_field_has_no_inverse() {
        let op = Operation::RemoveField {
            table: "product".into(),
            column: Column::new("sku", DataType::Text).not_null(),
        };
        assert!(op.inverse().is_none());

        let op = Operation::RemoveField {
            table: "product".into(),
            column: Column::new("sku", DataType::Text),
        };
        assert!(op.inverse().is_some());
    }

    #[test]
    fn test_json_round_trip() {
        let op = Operation::AddField {
            table: "color".into(),
            column: Column::new("image", DataType::Text),
        };
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"op\":\"add_field\""));
        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.describe(), op.describe());
    }
}
