//! Test fixtures and helpers
//!
//! - `Recorder`: tool registry whose tools log when they start and finish
//! - `RecordingReporter`: progress reporter that logs notifications
//! - plan YAML fixtures

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::time::Instant;

use wavefront::{ProgressReporter, StepOutcome, ToolArgs, ToolMap, ToolRegistry};

/// One tool invocation, timed against the recorder's creation
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Registry of timed test tools
///
/// Every tool reads a `name` argument (used to identify the call) and an
/// optional `ms` duration:
/// - `work`: async sleep for `ms`, returns its arguments
/// - `fail`: async sleep for `ms`, then fails
/// - `block`: thread sleep for `ms` on the blocking pool
#[derive(Clone)]
pub struct Recorder {
    base: Instant,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn registry(&self) -> Arc<dyn ToolRegistry> {
        let mut tools = ToolMap::new();

        let rec = self.clone();
        tools.register_async("work", move |args: ToolArgs| {
            let rec = rec.clone();
            async move {
                let start = rec.now_ms();
                tokio::time::sleep(duration_arg(&args)).await;
                rec.push(name_arg(&args), start);
                Ok::<_, anyhow::Error>(Value::Object(args))
            }
        });

        let rec = self.clone();
        tools.register_async("fail", move |args: ToolArgs| {
            let rec = rec.clone();
            async move {
                let start = rec.now_ms();
                tokio::time::sleep(duration_arg(&args)).await;
                rec.push(name_arg(&args), start);
                Err::<Value, _>(anyhow!("{} failed", name_arg(&args)))
            }
        });

        let rec = self.clone();
        tools.register_blocking("block", move |args: ToolArgs| {
            let start = rec.now_ms();
            std::thread::sleep(duration_arg(&args));
            rec.push(name_arg(&args), start);
            Ok(json!({ "name": name_arg(&args) }))
        });

        Arc::new(tools)
    }

    fn now_ms(&self) -> u64 {
        self.base.elapsed().as_millis() as u64
    }

    fn push(&self, name: String, start_ms: u64) {
        let end_ms = self.now_ms();
        self.calls.lock().push(Call {
            name,
            start_ms,
            end_ms,
        });
    }

    /// Calls in completion order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn call(&self, name: &str) -> Option<Call> {
        self.calls.lock().iter().find(|c| c.name == name).cloned()
    }

    /// Names ordered by start time (ties broken by name)
    pub fn start_order(&self) -> Vec<String> {
        let mut calls = self.calls();
        calls.sort_by(|a, b| a.start_ms.cmp(&b.start_ms).then_with(|| a.name.cmp(&b.name)));
        calls.into_iter().map(|c| c.name).collect()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }
}

fn name_arg(args: &ToolArgs) -> String {
    args.get("name")
        .and_then(Value::as_str)
        .unwrap_or("?")
        .to_string()
}

fn duration_arg(args: &ToolArgs) -> Duration {
    Duration::from_millis(args.get("ms").and_then(Value::as_u64).unwrap_or(0))
}

/// Progress reporter that logs `start:<id>@<wave>/<total>` and `ok:<id>` / `err:<id>`
#[derive(Default)]
pub struct RecordingReporter {
    pub events: Mutex<Vec<String>>,
    /// Fail every notification (after recording it)
    pub fail: bool,
}

impl RecordingReporter {
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn result(&self) -> anyhow::Result<()> {
        if self.fail {
            Err(anyhow!("reporter is broken"))
        } else {
            Ok(())
        }
    }
}

impl ProgressReporter for RecordingReporter {
    fn on_step_start(&self, step_id: &str, wave: usize, total_steps: usize) -> anyhow::Result<()> {
        self.events
            .lock()
            .push(format!("start:{step_id}@{wave}/{total_steps}"));
        self.result()
    }

    fn on_step_finish(&self, step_id: &str, outcome: StepOutcome<'_>) -> anyhow::Result<()> {
        let tag = if outcome.is_success() { "ok" } else { "err" };
        self.events.lock().push(format!("{tag}:{step_id}"));
        self.result()
    }
}

/// Plan using the built-in tools: fetch → (count, echo) → summary
pub fn builtin_plan_yaml() -> &'static str {
    r#"
rationale: count fetched items and echo the first one
steps:
  - id: fetch
    tool: echo
    args:
      items: [apple, banana, cherry]
  - id: count
    tool: count
    args:
      items: $fetch.items
    depends_on: [fetch]
  - id: first
    tool: echo
    args:
      item: $fetch.items.0
      price: $$3.50
    depends_on: [fetch]
  - id: summary
    tool: echo
    args:
      total: $count.count
      first: $first.item
    depends_on: [count, first]
"#
}

/// Plan whose second step fails
pub fn failing_plan_yaml() -> &'static str {
    r#"
steps:
  - id: ok
    tool: echo
    args: { v: 1 }
  - id: broken
    tool: fail
    args: { message: "disk full" }
    depends_on: [ok]
  - id: after
    tool: echo
    args: { v: $broken.v }
    depends_on: [broken]
"#
}
