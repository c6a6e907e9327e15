use crate::core::{Result, Row, Schema};
use crate::facade::MigratorConfig;
use crate::migrate::{
    Applier, ApplyOutcome, MigrationStep, RevertOutcome, RunLock, StepId, StepRegistry, plan,
};
use crate::schema::{JournalRecord, SchemaState, SchemaStore};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// High-level migration client.
///
/// Owns the schema state, the persistent store, and the step registry.
/// Readers query the shared state at any time; migration runs take the
/// advisory run lock and swap the state in whole between steps, so a reader
/// always sees a consistent prefix of the applied history.
///
/// # Examples
///
/// ```
/// use migradb::{Migrator, MigratorConfig, MigrationStep, Operation, Column, DataType, DurabilityMode};
///
/// # fn main() -> migradb::Result<()> {
/// # let dir = tempfile::TempDir::new().map_err(|e| migradb::MigrateError::IoError(e.to_string()))?;
/// let config = MigratorConfig::new(dir.path()).durability(DurabilityMode::None);
/// let mut migrator = Migrator::open(config)?;
///
/// migrator.register_step(
///     MigrationStep::new("store", "0001_initial").with_operation(Operation::CreateTable {
///         table: "product".into(),
///         columns: vec![Column::new("id", DataType::Integer)],
///     }),
/// )?;
///
/// tokio_test::block_on(async {
///     let applied = migrator.apply_all().await?;
///     assert_eq!(applied.len(), 1);
///     assert!(migrator.list_tables().await.contains(&"product".to_string()));
///     Ok(())
/// })
/// # }
/// ```
pub struct Migrator {
    config: MigratorConfig,
    registry: StepRegistry,
    store: Mutex<SchemaStore>,
    state: Arc<RwLock<SchemaState>>,
}

impl Migrator {
    /// Open the store under the configured data directory, recovering the
    /// last committed state, and load the step registry if a steps directory
    /// is configured.
    pub fn open(config: MigratorConfig) -> Result<Self> {
        config.validate()?;
        let store = SchemaStore::new(&config.data_dir, config.durability)?;
        let state = store.recover()?.unwrap_or_default();
        let registry = match &config.steps_dir {
            Some(dir) => StepRegistry::load_dir(dir)?,
            None => StepRegistry::new(),
        };
        Ok(Self {
            config,
            registry,
            store: Mutex::new(store),
            state: Arc::new(RwLock::new(state)),
        })
    }

    /// Register a step authored in code. History is append-only: a duplicate
    /// id is rejected.
    pub fn register_step(&mut self, step: MigrationStep) -> Result<()> {
        self.registry.register(step)
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// The order unapplied steps would run in. Never mutates anything.
    pub async fn plan(&self) -> Result<Vec<StepId>> {
        let state = self.state.read().await;
        Ok(plan(&self.registry, state.applied_steps())?
            .into_iter()
            .map(|step| step.id.clone())
            .collect())
    }

    /// Apply every unapplied step in dependency order. Holds the run lock for
    /// the whole run; stops at the first error, leaving the applied prefix.
    pub async fn apply_all(&self) -> Result<Vec<StepId>> {
        let _lock = RunLock::acquire(&self.config.data_dir)?;
        let mut working = self.state.read().await.clone();
        let order: Vec<MigrationStep> = plan(&self.registry, working.applied_steps())?
            .into_iter()
            .cloned()
            .collect();
        self.run_steps(&order, &mut working).await
    }

    /// Apply the target step and its transitive dependencies only.
    pub async fn apply_to(&self, target: &StepId) -> Result<Vec<StepId>> {
        self.registry.require(target)?;
        let _lock = RunLock::acquire(&self.config.data_dir)?;
        let mut working = self.state.read().await.clone();

        let mut closure = BTreeSet::new();
        let mut stack = vec![target.clone()];
        while let Some(id) = stack.pop() {
            if !closure.insert(id.clone()) {
                continue;
            }
            if let Some(step) = self.registry.get(&id) {
                stack.extend(step.dependencies.iter().cloned());
            }
        }

        let order: Vec<MigrationStep> = plan(&self.registry, working.applied_steps())?
            .into_iter()
            .filter(|step| closure.contains(&step.id))
            .cloned()
            .collect();
        self.run_steps(&order, &mut working).await
    }

    /// Apply a single step (its dependencies must already be applied).
    pub async fn apply_step(&self, id: &StepId) -> Result<ApplyOutcome> {
        let step = self.registry.require(id)?.clone();
        let _lock = RunLock::acquire(&self.config.data_dir)?;
        let mut working = self.state.read().await.clone();

        let outcome = {
            let mut store = self.store.lock().await;
            Applier::new(&mut working, &mut store).apply(&step)?
        };
        if outcome == ApplyOutcome::Applied {
            *self.state.write().await = working;
        }
        Ok(outcome)
    }

    /// Revert a single applied step.
    pub async fn revert_step(&self, id: &StepId) -> Result<RevertOutcome> {
        let step = self.registry.require(id)?.clone();
        let _lock = RunLock::acquire(&self.config.data_dir)?;
        let mut working = self.state.read().await.clone();

        let outcome = {
            let mut store = self.store.lock().await;
            Applier::new(&mut working, &mut store).revert(&step, &self.registry)?
        };
        if outcome == RevertOutcome::Reverted {
            *self.state.write().await = working;
        }
        Ok(outcome)
    }

    /// Every known step with its applied flag, in id order.
    pub async fn status(&self) -> Vec<(StepId, bool)> {
        let state = self.state.read().await;
        self.registry
            .iter()
            .map(|step| (step.id.clone(), state.is_applied(&step.id)))
            .collect()
    }

    /// The audit trail of apply/revert commits.
    pub async fn history(&self) -> Result<Vec<JournalRecord>> {
        self.store.lock().await.history()
    }

    pub async fn is_applied(&self, id: &StepId) -> bool {
        self.state.read().await.is_applied(id)
    }

    /// Current shape of an entity.
    pub async fn describe_table(&self, name: &str) -> Result<Schema> {
        self.state.read().await.describe_table(name)
    }

    pub async fn list_tables(&self) -> Vec<String> {
        self.state.read().await.list_tables()
    }

    /// Insert a data row (seeding, tests). Persisted via a checkpoint, not a
    /// migration record. Takes the run lock: a run works on a clone of the
    /// state and swaps it in wholesale, so a row slipped in mid-run would be
    /// erased by the next swap. Seeding during a run fails
    /// `ConcurrentRunDetected` instead.
    pub async fn insert_row(&self, table: &str, row: Row) -> Result<usize> {
        let _lock = RunLock::acquire(&self.config.data_dir)?;
        let mut state = self.state.write().await;
        let id = state.insert_row(table, row)?;
        self.store.lock().await.checkpoint(&state)?;
        Ok(id)
    }

    pub async fn scan_table(&self, table: &str) -> Result<Vec<Row>> {
        self.state.read().await.scan_table(table)
    }

    /// Apply `order` one step at a time, swapping the committed state in
    /// after each step so readers observe progress at step granularity.
    async fn run_steps(
        &self,
        order: &[MigrationStep],
        working: &mut SchemaState,
    ) -> Result<Vec<StepId>> {
        let mut applied = Vec::new();
        for step in order {
            {
                let mut store = self.store.lock().await;
                Applier::new(working, &mut store).apply(step)?;
            }
            *self.state.write().await = working.clone();
            applied.push(step.id.clone());
        }
        Ok(applied)
    }
}
