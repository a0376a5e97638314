//! Runtime module - executing plans
//!
//! - `registry`: [`Tool`] / [`ToolRegistry`] and the in-memory [`ToolMap`]
//! - `limiter`: [`ConcurrencyLimiter`] (tokio semaphore)
//! - `progress`: [`ProgressReporter`] notifications
//! - `executor`: the wavefront [`Executor`] and [`execute`]
//! - `builtin`: demo tools used by the CLI

mod builtin;
mod executor;
mod limiter;
mod progress;
mod registry;

pub use builtin::builtin_tools;
pub use executor::{execute, Executor, ExecutorBuilder, RunReport};
pub use limiter::{ConcurrencyLimiter, Permit};
pub use progress::{NoopReporter, ProgressReporter, StepOutcome};
pub use registry::{AsyncFnTool, BlockingTool, Tool, ToolArgs, ToolMap, ToolRegistry};
