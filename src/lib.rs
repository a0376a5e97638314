//! Wavefront - wave-by-wave parallel executor for tool plans
//!
//! A plan is a static list of steps. Each step calls one tool with
//! arguments that may reference results of the steps it depends on. The
//! executor runs the plan in waves: every step whose dependencies have all
//! succeeded starts together, and the next wave begins only once the
//! current one has fully settled.
//!
//! ## Module Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        DOMAIN MODEL                          │
//! │  plan/      YAML/JSON → Rust types (Plan, Step, ArgValue)    │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      APPLICATION LAYER                       │
//! │  runtime/   Wave execution (Executor, limiter, tools)        │
//! │  dag/       Dependency graph + validation                    │
//! │  binding/   Reference resolution ($step.path → value)        │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    INFRASTRUCTURE LAYER                      │
//! │  store/     Step state (ExecutionState)                      │
//! │  event/     Audit trail (EventLog, EventKind)                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`plan`] | Plan document parsing, step builder, reference syntax |
//! | [`dag`] | Dependency graph with FxHashMap, cycle detection, validation |
//! | [`binding`] | Checked path traversal over upstream results |
//! | [`runtime`] | Wavefront scheduling with tokio, tool registry, concurrency limit |
//! | [`store`] | Thread-safe step state (DashMap) |
//! | [`event`] | Event log for audit trail |
//! | [`config`] | Layered configuration (file, env, CLI) |
//! | [`error`] | Error types with codes and fix suggestions |
//!
//! ## Example
//!
//! ```rust,ignore
//! use wavefront::{builtin_tools, execute, Plan};
//!
//! let plan = Plan::from_yaml_str(yaml)?;
//! let report = execute(&plan, Arc::new(builtin_tools()), Some(4), None).await;
//! let state = report.into_result()?;
//! ```

// ═══════════════════════════════════════════════════════════════
// DOMAIN MODEL
// ═══════════════════════════════════════════════════════════════
pub mod plan;

// ═══════════════════════════════════════════════════════════════
// APPLICATION LAYER
// ═══════════════════════════════════════════════════════════════
pub mod binding;
pub mod dag;
pub mod runtime;

// ═══════════════════════════════════════════════════════════════
// INFRASTRUCTURE LAYER
// ═══════════════════════════════════════════════════════════════
pub mod event;
pub mod store;

// ═══════════════════════════════════════════════════════════════
// CROSS-CUTTING
// ═══════════════════════════════════════════════════════════════
pub mod config;
pub mod error;

// ═══════════════════════════════════════════════════════════════
// PUBLIC API RE-EXPORTS
// ═══════════════════════════════════════════════════════════════

pub use error::{FixSuggestion, ReferenceError, StepError, WaveError};

pub use config::{OutputFormat, WaveConfig};

pub use plan::{ArgValue, Args, Plan, RefExpr, Step};

pub use dag::{validate_plan, DependencyGraph};

pub use binding::{resolve_args, resolve_reference, resolve_value};

pub use runtime::{
    builtin_tools, execute, ConcurrencyLimiter, Executor, NoopReporter, ProgressReporter,
    RunReport, StepOutcome, Tool, ToolArgs, ToolMap, ToolRegistry,
};

pub use event::{Event, EventKind, EventLog};

pub use store::{ExecutionState, StepRecord, StepStatus};
