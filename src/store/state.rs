//! ExecutionState - per-step status and results with DashMap
//!
//! A step without an entry is pending. Entries are created when the step
//! starts running and are finalised exactly once (succeeded or failed).
//! Terminal entries are never overwritten.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::{json, Map, Value};

use crate::error::StepError;

/// Lifecycle of a step: pending → running → succeeded | failed
#[derive(Debug, Clone, PartialEq)]
pub enum StepStatus {
    Pending,
    Running,
    /// Result as JSON Value (Arc for O(1) cloning of large results)
    Succeeded(Arc<Value>),
    Failed(StepError),
}

impl StepStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

/// Recorded state of a step that left pending
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub status: StepStatus,
    /// Wave index the step was launched in (0-based)
    pub wave: usize,
    /// Set when the step reaches a terminal status
    pub duration: Option<Duration>,
}

/// Shared, clonable view of a run's step states
#[derive(Debug, Clone, Default)]
pub struct ExecutionState {
    records: Arc<DashMap<Arc<str>, StepRecord>>,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// pending → running. Returns false if the step already left pending.
    pub fn mark_running(&self, step_id: Arc<str>, wave: usize) -> bool {
        use dashmap::mapref::entry::Entry;

        match self.records.entry(step_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(StepRecord {
                    status: StepStatus::Running,
                    wave,
                    duration: None,
                });
                true
            }
        }
    }

    /// running → succeeded. Returns false if the step was not running.
    pub fn record_success(&self, step_id: &str, result: Arc<Value>, duration: Duration) -> bool {
        self.finish(step_id, StepStatus::Succeeded(result), duration)
    }

    /// running → failed. Returns false if the step was not running.
    pub fn record_failure(&self, step_id: &str, error: StepError, duration: Duration) -> bool {
        self.finish(step_id, StepStatus::Failed(error), duration)
    }

    fn finish(&self, step_id: &str, status: StepStatus, duration: Duration) -> bool {
        match self.records.get_mut(step_id) {
            Some(mut record) if matches!(record.status, StepStatus::Running) => {
                record.status = status;
                record.duration = Some(duration);
                true
            }
            _ => false,
        }
    }

    /// Current status (pending if never started)
    pub fn status(&self, step_id: &str) -> StepStatus {
        self.records
            .get(step_id)
            .map_or(StepStatus::Pending, |r| r.status.clone())
    }

    /// Full record, `None` while pending
    pub fn record(&self, step_id: &str) -> Option<StepRecord> {
        self.records.get(step_id).map(|r| r.clone())
    }

    /// Result of a succeeded step (O(1) clone)
    pub fn result(&self, step_id: &str) -> Option<Arc<Value>> {
        self.records.get(step_id).and_then(|r| match &r.status {
            StepStatus::Succeeded(value) => Some(Arc::clone(value)),
            _ => None,
        })
    }

    /// Error of a failed step
    pub fn error(&self, step_id: &str) -> Option<StepError> {
        self.records.get(step_id).and_then(|r| match &r.status {
            StepStatus::Failed(err) => Some(err.clone()),
            _ => None,
        })
    }

    #[inline]
    pub fn is_succeeded(&self, step_id: &str) -> bool {
        self.records
            .get(step_id)
            .is_some_and(|r| r.status.is_success())
    }

    /// True if the step has left pending
    #[inline]
    pub fn contains(&self, step_id: &str) -> bool {
        self.records.contains_key(step_id)
    }

    /// Number of steps that left pending
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count_succeeded(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status.is_success())
            .count()
    }

    pub fn count_failed(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.status, StepStatus::Failed(_)))
            .count()
    }

    /// Sorted ids of steps in a given status label
    pub fn ids_with_status(&self, label: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .records
            .iter()
            .filter(|r| r.status.label() == label)
            .map(|r| r.key().to_string())
            .collect();
        ids.sort();
        ids
    }

    /// Render as `{step_id: {status, wave, duration_ms, result | error}}`
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        for entry in self.records.iter() {
            let record = entry.value();
            let mut obj = json!({
                "status": record.status.label(),
                "wave": record.wave,
            });
            if let Some(duration) = record.duration {
                obj["duration_ms"] = json!(duration.as_millis() as u64);
            }
            match &record.status {
                StepStatus::Succeeded(value) => obj["result"] = (**value).clone(),
                StepStatus::Failed(err) => obj["error"] = json!(err.to_string()),
                StepStatus::Pending | StepStatus::Running => {}
            }
            out.insert(entry.key().to_string(), obj);
        }
        Value::Object(out)
    }
}
