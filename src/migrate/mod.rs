// ============================================================================
// Migration Engine Module
// ============================================================================
//
// Steps, operations, dependency planning, and the transactional applier.
//
// Invariants enforced here:
// - The applied set stays prefix-closed under the dependency partial order.
// - Each step applies or reverts as one transaction; no partial application
//   is ever observable.
// - Planning is deterministic and never mutates state.
//
// ============================================================================

pub mod applier;
pub mod lock;
pub mod operation;
pub mod planner;
pub mod registry;
pub mod step;

pub use applier::{Applier, ApplyOutcome, RevertOutcome};
pub use lock::RunLock;
pub use operation::Operation;
pub use planner::plan;
pub use registry::StepRegistry;
pub use step::{MigrationStep, StepId};
