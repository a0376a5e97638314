//! Progress reporting
//!
//! The executor notifies a [`ProgressReporter`] when each step starts and
//! when it finishes. Reporter errors are logged and otherwise ignored: a
//! broken progress sink never changes the outcome of a run.

use anyhow::Result;
use serde_json::Value;

use crate::error::StepError;

/// Terminal outcome of a step, as seen by a reporter
#[derive(Debug, Clone, Copy)]
pub enum StepOutcome<'a> {
    Succeeded(&'a Value),
    Failed(&'a StepError),
}

impl StepOutcome<'_> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

/// Receives step lifecycle notifications from the executor
pub trait ProgressReporter: Send + Sync {
    /// Called right before the step's tool is scheduled.
    ///
    /// `wave` is 0-based; `total_steps` is the size of the whole plan.
    fn on_step_start(&self, step_id: &str, wave: usize, total_steps: usize) -> Result<()>;

    /// Called once the step reached a terminal status
    fn on_step_finish(&self, step_id: &str, outcome: StepOutcome<'_>) -> Result<()>;
}

/// Reporter that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_step_start(&self, _step_id: &str, _wave: usize, _total_steps: usize) -> Result<()> {
        Ok(())
    }

    fn on_step_finish(&self, _step_id: &str, _outcome: StepOutcome<'_>) -> Result<()> {
        Ok(())
    }
}
