//! Event log for run execution
//!
//! Append-only audit trail of a run:
//! - Event: envelope with id + timestamp + kind
//! - EventKind: run, wave and step level variants
//! - EventLog: thread-safe, shared by clones

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single event in the run log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence ID (for ordering)
    pub id: u64,
    /// Time since the log was created (ms)
    pub timestamp_ms: u64,
    pub kind: EventKind,
}

/// All event types
///
/// Uses Arc<str> for step_id fields to enable zero-cost cloning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // ═══════════════════════════════════════════
    // RUN LEVEL
    // ═══════════════════════════════════════════
    RunStarted {
        run_id: String,
        step_count: usize,
        max_concurrent: Option<usize>,
    },
    RunCompleted {
        run_id: String,
        waves: usize,
        total_duration_ms: u64,
    },
    RunFailed {
        run_id: String,
        error: String,
        failed_step: Option<Arc<str>>,
    },

    // ═══════════════════════════════════════════
    // WAVE LEVEL
    // ═══════════════════════════════════════════
    WaveStarted {
        wave: usize,
        step_ids: Vec<Arc<str>>,
    },
    WaveCompleted {
        wave: usize,
        succeeded: usize,
        failed: usize,
        duration_ms: u64,
    },

    // ═══════════════════════════════════════════
    // STEP LEVEL
    // ═══════════════════════════════════════════
    StepStarted {
        step_id: Arc<str>,
        tool: String,
        wave: usize,
    },
    StepSucceeded {
        step_id: Arc<str>,
        result: Value,
        duration_ms: u64,
    },
    StepFailed {
        step_id: Arc<str>,
        error: String,
        duration_ms: u64,
    },
}

impl EventKind {
    /// Extract step_id if event is step-related
    pub fn step_id(&self) -> Option<&str> {
        match self {
            Self::StepStarted { step_id, .. }
            | Self::StepSucceeded { step_id, .. }
            | Self::StepFailed { step_id, .. } => Some(step_id),
            Self::RunStarted { .. }
            | Self::RunCompleted { .. }
            | Self::RunFailed { .. }
            | Self::WaveStarted { .. }
            | Self::WaveCompleted { .. } => None,
        }
    }

    pub fn is_run_event(&self) -> bool {
        matches!(
            self,
            Self::RunStarted { .. } | Self::RunCompleted { .. } | Self::RunFailed { .. }
        )
    }

    /// Wave index for wave-level events
    pub fn wave(&self) -> Option<usize> {
        match self {
            Self::WaveStarted { wave, .. }
            | Self::WaveCompleted { wave, .. }
            | Self::StepStarted { wave, .. } => Some(*wave),
            _ => None,
        }
    }
}

/// Thread-safe, append-only event log
#[derive(Clone)]
pub struct EventLog {
    events: Arc<RwLock<Vec<Event>>>,
    start_time: Instant,
    next_id: Arc<AtomicU64>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            start_time: Instant::now(),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event (returns event ID)
    pub fn emit(&self, kind: EventKind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let event = Event {
            id,
            timestamp_ms: self.start_time.elapsed().as_millis() as u64,
            kind,
        };

        self.events.write().push(event);
        id
    }

    /// Get all events (cloned)
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    pub fn filter_step(&self, step_id: &str) -> Vec<Event> {
        self.events
            .read()
            .iter()
            .filter(|e| e.kind.step_id() == Some(step_id))
            .cloned()
            .collect()
    }

    pub fn run_events(&self) -> Vec<Event> {
        self.events
            .read()
            .iter()
            .filter(|e| e.kind.is_run_event())
            .cloned()
            .collect()
    }

    /// Serialize to JSON for persistence/debugging
    pub fn to_json(&self) -> Value {
        serde_json::to_value(&*self.events.read()).unwrap_or(Value::Null)
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("len", &self.len())
            .finish()
    }
}
