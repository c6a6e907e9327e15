use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Cyclic dependency among migration steps: {}", remaining.join(", "))]
    CyclicDependency { remaining: Vec<String> },

    #[error("Step '{step}' depends on '{dependency}', which is neither known nor applied")]
    MissingDependency { step: String, dependency: String },

    #[error("Operation '{operation}' failed: {source}")]
    OperationFailed {
        operation: String,
        #[source]
        source: Box<MigrateError>,
    },

    #[error("Operation '{operation}' has no defined inverse")]
    NotReversible { operation: String },

    #[error("Cannot revert '{step}': applied steps still depend on it: {}", dependents.join(", "))]
    DependentStepsStillApplied { step: String, dependents: Vec<String> },

    #[error("Another migration run is in progress ({holder})")]
    ConcurrentRunDetected { holder: String },

    #[error("Step '{0}' is already registered")]
    DuplicateStep(String),

    #[error("Step '{0}' is not known to the registry")]
    UnknownStep(String),

    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Column '{0}' already exists in table '{1}'")]
    ColumnExists(String, String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

pub type Result<T> = std::result::Result<T, MigrateError>;

impl From<std::io::Error> for MigrateError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}
