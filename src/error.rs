//! Wavefront Error Types with Error Codes
//!
//! Error code ranges:
//! - WAVE-000-009: Plan structure errors (raised before any tool runs)
//! - WAVE-010-019: Run errors
//! - WAVE-020-029: Configuration errors
//! - WAVE-040-049: Reference resolution errors
//! - WAVE-050-059: Per-step errors
//! - WAVE-090-099: IO / parse errors
//!
//! Three layers:
//! - [`ReferenceError`]: why a `$step.path` expression could not be resolved
//! - [`StepError`]: why a single step failed (stored in the execution state, so `Clone`)
//! - [`WaveError`]: why a whole run (or its setup) failed

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WaveError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

// ═══════════════════════════════════════════
// REFERENCE ERRORS (040-049)
// ═══════════════════════════════════════════

/// Failure to resolve a reference expression against recorded results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("[WAVE-040] Invalid reference expression '{expr}': {reason}")]
    Syntax { expr: String, reason: String },

    #[error("[WAVE-041] Step '{step_id}' has not succeeded (referenced by '{expr}')")]
    NotSucceeded { step_id: String, expr: String },

    #[error("[WAVE-042] Key '{segment}' not found while resolving '{expr}'")]
    MissingKey { expr: String, segment: String },

    #[error("[WAVE-043] Index {index} out of range (length {len}) while resolving '{expr}'")]
    IndexOutOfRange {
        expr: String,
        index: usize,
        len: usize,
    },

    #[error("[WAVE-044] Segment '{segment}' is not a sequence index while resolving '{expr}'")]
    InvalidIndex { expr: String, segment: String },

    #[error(
        "[WAVE-045] Cannot traverse '{segment}' on {value_type} while resolving '{expr}' (expected mapping/sequence)"
    )]
    NotComposite {
        expr: String,
        segment: String,
        value_type: String,
    },
}

impl ReferenceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "WAVE-040",
            Self::NotSucceeded { .. } => "WAVE-041",
            Self::MissingKey { .. } => "WAVE-042",
            Self::IndexOutOfRange { .. } => "WAVE-043",
            Self::InvalidIndex { .. } => "WAVE-044",
            Self::NotComposite { .. } => "WAVE-045",
        }
    }
}

// ═══════════════════════════════════════════
// STEP ERRORS (050-059)
// ═══════════════════════════════════════════

/// Why a single step ended in the `failed` state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("[WAVE-050] Step '{step_id}' could not resolve its arguments: {source}")]
    Reference {
        step_id: String,
        #[source]
        source: ReferenceError,
    },

    #[error("[WAVE-051] Step '{step_id}' tool '{tool}' failed: {cause}")]
    ToolExecution {
        step_id: String,
        tool: String,
        cause: String,
    },

    #[error(
        "[WAVE-052] Step '{step_id}' uses unknown tool '{tool}' (available: {})",
        .available.join(", ")
    )]
    ToolNotFound {
        step_id: String,
        tool: String,
        available: Vec<String>,
    },
}

impl StepError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Reference { .. } => "WAVE-050",
            Self::ToolExecution { .. } => "WAVE-051",
            Self::ToolNotFound { .. } => "WAVE-052",
        }
    }

    /// The step this error belongs to
    pub fn step_id(&self) -> &str {
        match self {
            Self::Reference { step_id, .. }
            | Self::ToolExecution { step_id, .. }
            | Self::ToolNotFound { step_id, .. } => step_id,
        }
    }
}

// ═══════════════════════════════════════════
// RUN ERRORS
// ═══════════════════════════════════════════

/// All run-level error variants are part of the public API.
#[derive(Error, Debug)]
pub enum WaveError {
    // ═══════════════════════════════════════════
    // PLAN ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[WAVE-001] Malformed plan at step '{step_id}': {reason}")]
    MalformedPlan { step_id: String, reason: String },

    #[error("[WAVE-002] Cycle detected in plan: {}", .cycle.join(" → "))]
    Cycle { cycle: Vec<String> },

    // ═══════════════════════════════════════════
    // RUN ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[WAVE-010] Run failed at step '{step_id}': {source}")]
    StepFailed {
        step_id: String,
        #[source]
        source: StepError,
    },

    #[error(
        "[WAVE-011] Deadlock: {} step(s) pending but none ready or running ({})",
        .pending.len(),
        .pending.join(", ")
    )]
    Deadlock { pending: Vec<String> },

    // ═══════════════════════════════════════════
    // CONFIG ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[WAVE-020] Invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("[WAVE-021] Config file error: {reason}")]
    ConfigFile { reason: String },

    // ═══════════════════════════════════════════
    // IO / PARSE ERRORS (090-099)
    // ═══════════════════════════════════════════
    #[error("[WAVE-093] IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("[WAVE-094] JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("[WAVE-095] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

impl WaveError {
    /// Get the error code (e.g., "WAVE-001")
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedPlan { .. } => "WAVE-001",
            Self::Cycle { .. } => "WAVE-002",
            Self::StepFailed { .. } => "WAVE-010",
            Self::Deadlock { .. } => "WAVE-011",
            Self::Configuration { .. } => "WAVE-020",
            Self::ConfigFile { .. } => "WAVE-021",
            Self::Io(_) => "WAVE-093",
            Self::Json(_) => "WAVE-094",
            Self::YamlParse(_) => "WAVE-095",
        }
    }

    /// Structural errors are detected before any tool is invoked
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::MalformedPlan { .. } | Self::Cycle { .. })
    }

    /// Id of the step that failed the run, if the run failed on a step
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            Self::StepFailed { step_id, .. } => Some(step_id),
            _ => None,
        }
    }

    pub(crate) fn malformed(step_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPlan {
            step_id: step_id.into(),
            reason: reason.into(),
        }
    }
}

impl From<StepError> for WaveError {
    fn from(source: StepError) -> Self {
        Self::StepFailed {
            step_id: source.step_id().to_string(),
            source,
        }
    }
}

impl FixSuggestion for ReferenceError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            Self::Syntax { .. } => Some("Use the form $step_id.field.0.subfield"),
            Self::NotSucceeded { .. } => {
                Some("List the referenced step in depends_on so it runs first")
            }
            Self::MissingKey { .. } => Some("Check the field names of the upstream result"),
            Self::IndexOutOfRange { .. } => Some("Check the length of the upstream sequence"),
            Self::InvalidIndex { .. } => Some("Sequences are indexed with non-negative numbers"),
            Self::NotComposite { .. } => {
                Some("The path continues past a scalar value; shorten the path")
            }
        }
    }
}

impl FixSuggestion for StepError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            Self::Reference { source, .. } => source.fix_suggestion(),
            Self::ToolExecution { .. } => Some("Check the tool arguments and the tool's own logs"),
            Self::ToolNotFound { .. } => Some("Use one of the registered tool ids"),
        }
    }
}

impl FixSuggestion for WaveError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            Self::MalformedPlan { .. } => {
                Some("Step ids must be unique and every dependency must name an existing step")
            }
            Self::Cycle { .. } => Some("Remove one dependency from the cycle"),
            Self::StepFailed { source, .. } => source.fix_suggestion(),
            Self::Deadlock { .. } => Some("Run `wavefront check` on the plan"),
            Self::Configuration { .. } => Some("max_concurrent must be a positive integer"),
            Self::ConfigFile { .. } => Some("Check the TOML syntax of the config file"),
            Self::Io(_) => Some("Check file path and permissions"),
            Self::Json(_) => Some("Check JSON syntax"),
            Self::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_plan_code_and_display() {
        let err = WaveError::malformed("b", "depends on unknown step 'z'");
        assert_eq!(err.code(), "WAVE-001");
        assert!(err.is_structural());
        let msg = err.to_string();
        assert!(msg.contains("[WAVE-001]"));
        assert!(msg.contains("'b'"));
        assert!(msg.contains("unknown step 'z'"));
    }

    #[test]
    fn cycle_display_joins_path() {
        let err = WaveError::Cycle {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "[WAVE-002] Cycle detected in plan: a → b → a");
        assert!(err.is_structural());
    }

    #[test]
    fn step_error_converts_to_step_failed() {
        let step_err = StepError::ToolExecution {
            step_id: "parse".into(),
            tool: "pdf.extract".into(),
            cause: "file not found".into(),
        };
        let err: WaveError = step_err.clone().into();
        assert_eq!(err.failed_step(), Some("parse"));
        assert!(!err.is_structural());
        match err {
            WaveError::StepFailed { source, .. } => assert_eq!(source, step_err),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn reference_error_is_step_scoped() {
        let err = StepError::Reference {
            step_id: "b".into(),
            source: ReferenceError::MissingKey {
                expr: "$a.missing".into(),
                segment: "missing".into(),
            },
        };
        assert_eq!(err.step_id(), "b");
        assert_eq!(err.code(), "WAVE-050");
        assert!(err.to_string().contains("WAVE-042"));
        assert_eq!(
            err.fix_suggestion(),
            Some("Check the field names of the upstream result")
        );
    }

    #[test]
    fn tool_not_found_lists_available_tools() {
        let err = StepError::ToolNotFound {
            step_id: "x".into(),
            tool: "nope".into(),
            available: vec!["echo".into(), "sleep".into()],
        };
        assert!(err.to_string().contains("available: echo, sleep"));
    }

    #[test]
    fn deadlock_lists_pending_steps() {
        let err = WaveError::Deadlock {
            pending: vec!["c".into(), "d".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 step(s)"));
        assert!(msg.contains("c, d"));
        assert_eq!(err.code(), "WAVE-011");
    }

    #[test]
    fn every_run_error_has_a_suggestion() {
        let errors = vec![
            WaveError::malformed("a", "x"),
            WaveError::Cycle { cycle: vec![] },
            WaveError::Deadlock { pending: vec![] },
            WaveError::Configuration { reason: "x".into() },
            WaveError::ConfigFile { reason: "x".into() },
        ];
        for err in errors {
            assert!(err.fix_suggestion().is_some(), "{} has no suggestion", err.code());
        }
    }
}
