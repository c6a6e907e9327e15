use crate::core::{MigrateError, Result};
use crate::migrate::Operation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a migration step, scoped to a schema namespace
/// (e.g. `store.0003_rename_color_name`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StepId {
    pub namespace: String,
    pub name: String,
}

impl StepId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

impl FromStr for StepId {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('.') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::new(namespace, name))
            }
            _ => Err(MigrateError::ParseError(format!(
                "Invalid step id '{}': expected 'namespace.name'",
                s
            ))),
        }
    }
}

/// One entry in the append-only migration history. Immutable once committed;
/// authored either in code or as a JSON document in the steps directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationStep {
    pub id: StepId,
    #[serde(default)]
    pub dependencies: Vec<StepId>,
    pub operations: Vec<Operation>,
}

impl MigrationStep {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: StepId::new(namespace, name),
            dependencies: Vec::new(),
            operations: Vec::new(),
        }
    }

    pub fn depends_on(mut self, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        self.dependencies.push(StepId::new(namespace, name));
        self
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }
}
