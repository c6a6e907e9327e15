use migradb::{
    Applier, ApplyOutcome, Column, DataType, DurabilityMode, MigrateError, MigrationStep,
    Operation, SchemaState, SchemaStore, StepId, StepRegistry, Value,
};

fn memory_store() -> SchemaStore {
    SchemaStore::new("unused", DurabilityMode::None).unwrap()
}

fn create_product() -> MigrationStep {
    MigrationStep::new("store", "0001_initial").with_operation(Operation::CreateTable {
        table: "product".into(),
        columns: vec![
            Column::new("id", DataType::Integer),
            Column::new("title", DataType::Text),
            Column::new("user", DataType::Text),
        ],
    })
}

fn remove_product_user() -> MigrationStep {
    MigrationStep::new("store", "0002_remove_product_user")
        .depends_on("store", "0001_initial")
        .with_operation(Operation::RemoveField {
            table: "product".into(),
            column: Column::new("user", DataType::Text),
        })
}

#[test]
fn apply_creates_table_and_marks_applied() {
    let mut state = SchemaState::new();
    let mut store = memory_store();
    let mut applier = Applier::new(&mut state, &mut store);

    let outcome = applier.apply(&create_product()).unwrap();
    assert_eq!(outcome, ApplyOutcome::Applied);

    assert!(state.table_exists("product"));
    assert!(state.is_applied(&StepId::new("store", "0001_initial")));
}

#[test]
fn apply_is_idempotent() {
    let mut state = SchemaState::new();
    let mut store = memory_store();
    let step = create_product();

    Applier::new(&mut state, &mut store).apply(&step).unwrap();
    state
        .insert_row(
            "product",
            vec![
                Value::Integer(1),
                Value::Text("Desk".into()),
                Value::Text("alice".into()),
            ],
        )
        .unwrap();

    // Re-applying does not re-execute operations or disturb data.
    let outcome = Applier::new(&mut state, &mut store).apply(&step).unwrap();
    assert_eq!(outcome, ApplyOutcome::AlreadyApplied);
    assert_eq!(state.scan_table("product").unwrap().len(), 1);
}

#[test]
fn apply_requires_dependencies_applied() {
    let mut state = SchemaState::new();
    let mut store = memory_store();

    let err = Applier::new(&mut state, &mut store)
        .apply(&remove_product_user())
        .unwrap_err();
    match err {
        MigrateError::MissingDependency { step, dependency } => {
            assert_eq!(step, "store.0002_remove_product_user");
            assert_eq!(dependency, "store.0001_initial");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!state.is_applied(&StepId::new("store", "0002_remove_product_user")));
}

#[test]
fn failing_operation_rolls_back_whole_step() {
    let mut state = SchemaState::new();
    let mut store = memory_store();

    // Second operation targets a table that does not exist; the first
    // operation's effect must not survive.
    let step = MigrationStep::new("store", "0001_broken")
        .with_operation(Operation::CreateTable {
            table: "color".into(),
            columns: vec![Column::new("id", DataType::Integer)],
        })
        .with_operation(Operation::AddField {
            table: "missing".into(),
            column: Column::new("x", DataType::Integer),
        });

    let err = Applier::new(&mut state, &mut store).apply(&step).unwrap_err();
    match err {
        MigrateError::OperationFailed { operation, source } => {
            assert_eq!(operation, "add_field missing.x");
            assert!(matches!(*source, MigrateError::TableNotFound(_)));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    assert!(!state.table_exists("color"));
    assert!(!state.is_applied(&StepId::new("store", "0001_broken")));
}

#[test]
fn migrate_all_applies_in_dependency_order() {
    let mut registry = StepRegistry::new();
    registry.register(remove_product_user()).unwrap();
    registry.register(create_product()).unwrap();

    let mut state = SchemaState::new();
    let mut store = memory_store();
    let applied = Applier::new(&mut state, &mut store)
        .migrate_all(&registry)
        .unwrap();

    assert_eq!(
        applied,
        vec![
            StepId::new("store", "0001_initial"),
            StepId::new("store", "0002_remove_product_user"),
        ]
    );
    assert!(state.describe_table("product").unwrap().get_column("user").is_none());
}

#[test]
fn migrate_all_stops_at_first_error_keeping_prefix() {
    let mut registry = StepRegistry::new();
    registry.register(create_product()).unwrap();
    registry
        .register(
            MigrationStep::new("store", "0002_broken")
                .depends_on("store", "0001_initial")
                .with_operation(Operation::DropTable { table: "missing".into() }),
        )
        .unwrap();

    let mut state = SchemaState::new();
    let mut store = memory_store();
    let err = Applier::new(&mut state, &mut store)
        .migrate_all(&registry)
        .unwrap_err();
    assert!(matches!(err, MigrateError::OperationFailed { .. }));

    // The prefix stays applied; the failed step does not.
    assert!(state.is_applied(&StepId::new("store", "0001_initial")));
    assert!(!state.is_applied(&StepId::new("store", "0002_broken")));
}

#[test]
fn migrate_to_applies_only_target_closure() {
    let mut registry = StepRegistry::new();
    registry.register(create_product()).unwrap();
    registry.register(remove_product_user()).unwrap();
    registry
        .register(
            MigrationStep::new("vendor", "0001_initial").with_operation(Operation::CreateTable {
                table: "vendor".into(),
                columns: vec![Column::new("id", DataType::Integer)],
            }),
        )
        .unwrap();

    let mut state = SchemaState::new();
    let mut store = memory_store();
    let applied = Applier::new(&mut state, &mut store)
        .migrate_to(&registry, &StepId::new("store", "0002_remove_product_user"))
        .unwrap();

    assert_eq!(applied.len(), 2);
    assert!(state.table_exists("product"));
    assert!(!state.table_exists("vendor"));
}

#[test]
fn migrate_to_unknown_target_fails() {
    let registry = StepRegistry::new();
    let mut state = SchemaState::new();
    let mut store = memory_store();

    let err = Applier::new(&mut state, &mut store)
        .migrate_to(&registry, &StepId::new("store", "0009_missing"))
        .unwrap_err();
    assert!(matches!(err, MigrateError::UnknownStep(_)));
}
