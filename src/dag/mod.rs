//! DAG module - dependency graph and structural validation
//!
//! - `graph`: [`DependencyGraph`] with cycle detection and wave preview
//! - `validate`: [`validate_plan`], the gate every run passes first

mod graph;
mod validate;

pub use graph::{DepVec, DependencyGraph};
pub use validate::validate_plan;
