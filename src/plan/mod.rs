//! Plan module - the data model a run executes
//!
//! - `model`: [`Plan`] and [`Step`], loaded from YAML/JSON or built in code
//! - `arg`: [`ArgValue`] literals and nested references
//! - `reference`: [`RefExpr`] `$step.path` expressions

mod arg;
mod model;
mod reference;

pub use arg::{ArgValue, Args};
pub use model::{Plan, Step};
pub use reference::{RefExpr, REFERENCE_SIGIL};
