//! Store module - run-time step state
//!
//! - `state`: [`ExecutionState`], the single source of truth for step status

mod state;

pub use state::{ExecutionState, StepRecord, StepStatus};
