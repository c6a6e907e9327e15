use super::{DataType, MigrateError, Result, Value};
use serde::{Deserialize, Serialize};

pub type Row = Vec<Value>;

fn default_nullable() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub default: Option<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            unique: false,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// The value existing rows take on for this column when none was stored.
    pub fn fill_value(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        if value.is_null() {
            if !self.nullable {
                return Err(MigrateError::ConstraintViolation(format!(
                    "Column '{}' cannot be NULL",
                    self.name
                )));
            }
            return Ok(());
        }

        if !self.data_type.is_compatible(value) {
            return Err(MigrateError::TypeMismatch(format!(
                "Column '{}' expects type {}, got {}",
                self.name,
                self.data_type,
                value.type_name()
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn find_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == name)
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.find_column_index(name).map(|idx| &self.columns[idx])
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub(crate) fn push_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    pub(crate) fn remove_column(&mut self, idx: usize) -> Column {
        self.columns.remove(idx)
    }

    pub(crate) fn column_mut(&mut self, idx: usize) -> &mut Column {
        &mut self.columns[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_validate_null() {
        let col = Column::new("age", DataType::Integer);
        assert!(col.validate(&Value::Null).is_ok());

        let col = col.not_null();
        assert!(col.validate(&Value::Null).is_err());
    }

    #[test]
    fn test_column_validate_type() {
        let col = Column::new("name", DataType::Text);
        assert!(col.validate(&Value::Text("Alice".into())).is_ok());
        assert!(col.validate(&Value::Integer(1)).is_err());
    }

    #[test]
    fn test_fill_value() {
        let col = Column::new("qty", DataType::Integer);
        assert_eq!(col.fill_value(), Value::Null);

        let col = col.default_value(0i64);
        assert_eq!(col.fill_value(), Value::Integer(0));
    }

    #[test]
    fn test_schema_lookup() {
        let schema = Schema::new(vec![
            Column::new("id", DataType::Integer),
            Column::new("title", DataType::Text),
        ]);
        assert_eq!(schema.find_column_index("title"), Some(1));
        assert!(schema.get_column("missing").is_none());
        assert_eq!(schema.column_count(), 2);
    }
}
