use crate::core::{MigrateError, Result};
use crate::migrate::{MigrationStep, StepId};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// The append-only set of known migration steps.
///
/// Steps register exactly once; a duplicate id is an authoring error. Ordered
/// by id, so iteration (and the planner's tie-break) is deterministic.
#[derive(Debug, Default)]
pub struct StepRegistry {
    steps: BTreeMap<StepId, MigrationStep>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, step: MigrationStep) -> Result<()> {
        if self.steps.contains_key(&step.id) {
            return Err(MigrateError::DuplicateStep(step.id.to_string()));
        }
        self.steps.insert(step.id.clone(), step);
        Ok(())
    }

    /// Load every `*.json` step file from a directory, in lexicographic
    /// filename order (the authoring convention numbers files so the order
    /// matches history).
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        let entries = fs::read_dir(dir)
            .map_err(|e| MigrateError::IoError(format!("Failed to read steps directory '{}': {}", dir.display(), e)))?;
        for entry in entries {
            let entry = entry
                .map_err(|e| MigrateError::IoError(format!("Failed to read directory entry: {}", e)))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut registry = Self::new();
        for path in paths {
            let data = fs::read_to_string(&path)
                .map_err(|e| MigrateError::IoError(format!("Failed to read '{}': {}", path.display(), e)))?;
            let step: MigrationStep = serde_json::from_str(&data).map_err(|e| {
                MigrateError::ParseError(format!("Invalid step file '{}': {}", path.display(), e))
            })?;
            registry.register(step)?;
        }
        Ok(registry)
    }

    pub fn get(&self, id: &StepId) -> Option<&MigrationStep> {
        self.steps.get(id)
    }

    pub fn require(&self, id: &StepId) -> Result<&MigrationStep> {
        self.get(id)
            .ok_or_else(|| MigrateError::UnknownStep(id.to_string()))
    }

    pub fn contains(&self, id: &StepId) -> bool {
        self.steps.contains_key(id)
    }

    /// Steps that declare a dependency on `id`, in id order.
    pub fn dependents(&self, id: &StepId) -> Vec<&StepId> {
        self.steps
            .values()
            .filter(|step| step.dependencies.contains(id))
            .map(|step| &step.id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MigrationStep> {
        self.steps.values()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType};
    use crate::migrate::Operation;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = StepRegistry::new();
        registry
            .register(MigrationStep::new("store", "0001_initial"))
            .unwrap();
        let err = registry
            .register(MigrationStep::new("store", "0001_initial"))
            .unwrap_err();
        assert!(matches!(err, MigrateError::DuplicateStep(_)));
    }

    #[test]
    fn test_dependents() {
        let mut registry = StepRegistry::new();
        registry
            .register(MigrationStep::new("store", "0001_initial"))
            .unwrap();
        registry
            .register(
                MigrationStep::new("store", "0002_remove_product_user")
                    .depends_on("store", "0001_initial"),
            )
            .unwrap();

        let dependents = registry.dependents(&StepId::new("store", "0001_initial"));
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].name, "0002_remove_product_user");
    }

    #[test]
    fn test_load_dir() {
        let temp_dir = TempDir::new().unwrap();
        let step = MigrationStep::new("store", "0001_initial").with_operation(
            Operation::CreateTable {
                table: "product".into(),
                columns: vec![Column::new("id", DataType::Integer)],
            },
        );
        fs::write(
            temp_dir.path().join("0001_initial.json"),
            serde_json::to_string_pretty(&step).unwrap(),
        )
        .unwrap();
        // Non-json files are ignored.
        fs::write(temp_dir.path().join("README.txt"), "notes").unwrap();

        let registry = StepRegistry::load_dir(temp_dir.path()).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&StepId::new("store", "0001_initial")));
    }

    #[test]
    fn test_load_dir_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("0001_bad.json"), "{not json").unwrap();
        let err = StepRegistry::load_dir(temp_dir.path()).unwrap_err();
        assert!(matches!(err, MigrateError::ParseError(_)));
    }
}
