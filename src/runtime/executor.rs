//! Wavefront Executor - level-synchronous plan execution with tokio
//!
//! One control loop per run:
//! 1. validate the plan (nothing runs if it is malformed)
//! 2. compute the ready set: pending steps whose dependencies all succeeded
//! 3. launch the whole ready set as one wave on a JoinSet
//! 4. join every task of the wave, recording outcomes as they arrive
//! 5. stop after the first wave containing a failure
//!
//! Every `ExecutionState` write happens here, in the control loop. Spawned
//! step tasks only read results of earlier waves while resolving arguments.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::{json, Value};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::binding::resolve_args;
use crate::dag::validate_plan;
use crate::error::{StepError, WaveError};
use crate::event::{EventKind, EventLog};
use crate::plan::{Plan, Step};
use crate::store::ExecutionState;

use super::limiter::ConcurrencyLimiter;
use super::progress::{NoopReporter, ProgressReporter, StepOutcome};
use super::registry::{panic_message, ToolMap, ToolRegistry};

/// Outcome of a whole run
#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    /// Final (possibly partial) step states
    pub state: ExecutionState,
    /// Step ids per launched wave, in launch order
    pub waves: Vec<Vec<Arc<str>>>,
    pub duration: Duration,
    /// Highest number of tools observed running at once
    pub peak_concurrency: usize,
    /// First failure, `None` on success
    pub error: Option<WaveError>,
}

impl RunReport {
    #[inline]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Step the run failed on, if it failed on a step
    pub fn failed_step(&self) -> Option<&str> {
        self.error.as_ref().and_then(WaveError::failed_step)
    }

    pub fn into_result(self) -> Result<ExecutionState, WaveError> {
        match self.error {
            None => Ok(self.state),
            Some(err) => Err(err),
        }
    }

    /// Run result document: `{run_id, success, waves, duration_ms, steps, error?}`
    pub fn to_json(&self) -> Value {
        let waves: Vec<Vec<&str>> = self
            .waves
            .iter()
            .map(|w| w.iter().map(AsRef::as_ref).collect())
            .collect();

        let mut doc = json!({
            "run_id": self.run_id,
            "success": self.is_success(),
            "waves": waves,
            "duration_ms": self.duration.as_millis() as u64,
            "steps": self.state.to_json(),
        });
        if let Some(err) = &self.error {
            doc["error"] = json!({
                "code": err.code(),
                "message": err.to_string(),
                "step_id": err.failed_step(),
            });
        }
        doc
    }
}

/// Result of one spawned step task
struct StepRun {
    outcome: Result<Value, StepError>,
    duration: Duration,
}

/// Executes plans against a tool registry
pub struct Executor {
    registry: Arc<dyn ToolRegistry>,
    max_concurrent: Option<usize>,
    event_log: EventLog,
}

/// Builder for [`Executor`]
#[derive(Default)]
pub struct ExecutorBuilder {
    registry: Option<Arc<dyn ToolRegistry>>,
    max_concurrent: Option<usize>,
    event_log: Option<EventLog>,
}

impl ExecutorBuilder {
    pub fn registry(mut self, registry: impl ToolRegistry + 'static) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    pub fn registry_arc(mut self, registry: Arc<dyn ToolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// `None` (the default) runs every step of a wave at once
    pub fn max_concurrent(mut self, max_concurrent: Option<usize>) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Share an existing event log instead of creating one
    pub fn event_log(mut self, event_log: EventLog) -> Self {
        self.event_log = Some(event_log);
        self
    }

    /// Fails with `Configuration` on a zero bound
    pub fn build(self) -> Result<Executor, WaveError> {
        // Validate the bound now rather than on first run
        ConcurrencyLimiter::new(self.max_concurrent)?;

        Ok(Executor {
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(ToolMap::new())),
            max_concurrent: self.max_concurrent,
            event_log: self.event_log.unwrap_or_default(),
        })
    }
}

impl Executor {
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::default()
    }

    #[inline]
    pub fn max_concurrent(&self) -> Option<usize> {
        self.max_concurrent
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn registry(&self) -> &Arc<dyn ToolRegistry> {
        &self.registry
    }

    /// Run a plan to completion or first failure
    #[instrument(name = "run", skip_all, fields(steps = plan.len(), run_id = tracing::field::Empty))]
    pub async fn run(&self, plan: &Plan, progress: &dyn ProgressReporter) -> RunReport {
        let started = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        let state = ExecutionState::new();
        let mut report = RunReport {
            run_id: run_id.clone(),
            state: state.clone(),
            waves: Vec::new(),
            duration: Duration::ZERO,
            peak_concurrency: 0,
            error: None,
        };

        self.event_log.emit(EventKind::RunStarted {
            run_id: run_id.clone(),
            step_count: plan.len(),
            max_concurrent: self.max_concurrent,
        });
        info!(max_concurrent = ?self.max_concurrent, "starting run");

        let error = match ConcurrencyLimiter::new(self.max_concurrent) {
            Err(err) => Some(err),
            Ok(limiter) => match validate_plan(plan) {
                Err(err) => Some(err),
                Ok(_) => {
                    let error = self
                        .run_waves(plan, &state, &limiter, progress, &mut report.waves)
                        .await;
                    report.peak_concurrency = limiter.peak();
                    error
                }
            },
        };

        report.duration = started.elapsed();
        match &error {
            None => {
                self.event_log.emit(EventKind::RunCompleted {
                    run_id,
                    waves: report.waves.len(),
                    total_duration_ms: report.duration.as_millis() as u64,
                });
                info!(
                    waves = report.waves.len(),
                    duration_ms = report.duration.as_millis() as u64,
                    "run completed"
                );
            }
            Some(err) => {
                self.event_log.emit(EventKind::RunFailed {
                    run_id,
                    error: err.to_string(),
                    failed_step: err.failed_step().map(Arc::from),
                });
                warn!(code = err.code(), error = %err, "run failed");
            }
        }
        report.error = error;
        report
    }

    /// Launch waves until the plan is done or a wave fails
    async fn run_waves(
        &self,
        plan: &Plan,
        state: &ExecutionState,
        limiter: &ConcurrencyLimiter,
        progress: &dyn ProgressReporter,
        waves: &mut Vec<Vec<Arc<str>>>,
    ) -> Option<WaveError> {
        loop {
            let ready = ready_steps(plan, state);

            if ready.is_empty() {
                // Between waves nothing is running, so anything pending is stuck
                let pending: Vec<String> = plan
                    .steps
                    .iter()
                    .filter(|s| !state.contains(&s.id))
                    .map(|s| s.id.clone())
                    .collect();
                if pending.is_empty() {
                    return None;
                }
                return Some(WaveError::Deadlock { pending });
            }

            let wave = waves.len();
            waves.push(ready.iter().map(|s| Arc::from(s.id.as_str())).collect());

            if let Some(err) = self
                .run_wave(wave, &ready, plan.len(), state, limiter, progress)
                .await
            {
                return Some(err);
            }
        }
    }

    /// Launch one wave and wait for every task in it
    async fn run_wave(
        &self,
        wave: usize,
        ready: &[Arc<Step>],
        total_steps: usize,
        state: &ExecutionState,
        limiter: &ConcurrencyLimiter,
        progress: &dyn ProgressReporter,
    ) -> Option<WaveError> {
        let wave_started = Instant::now();
        let step_ids: Vec<Arc<str>> = ready.iter().map(|s| Arc::from(s.id.as_str())).collect();

        self.event_log.emit(EventKind::WaveStarted {
            wave,
            step_ids: step_ids.clone(),
        });
        info!(wave, steps = ready.len(), "wave started");

        let mut join_set = JoinSet::new();
        for (index, (step, step_id)) in ready.iter().zip(&step_ids).enumerate() {
            state.mark_running(Arc::clone(step_id), wave);
            self.event_log.emit(EventKind::StepStarted {
                step_id: Arc::clone(step_id),
                tool: step.tool.clone(),
                wave,
            });
            report_progress(step_id, || progress.on_step_start(step_id, wave, total_steps));

            let step = Arc::clone(step);
            let state = state.clone();
            let registry = Arc::clone(&self.registry);
            let limiter = limiter.clone();
            join_set.spawn(async move { (index, run_step(step, state, registry, limiter).await) });
        }

        // Outcomes indexed by launch order for a deterministic first failure
        let mut failures: Vec<Option<StepError>> = vec![None; ready.len()];
        let mut settled = vec![false; ready.len()];
        let mut succeeded = 0usize;

        while let Some(joined) = join_set.join_next().await {
            let (index, run) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    // Only cancellation reaches here; panics are caught inside the task
                    warn!(wave, error = %e, "step task could not be joined");
                    continue;
                }
            };
            settled[index] = true;
            match run.outcome {
                Ok(result) => {
                    succeeded += 1;
                    self.finish_success(&step_ids[index], result, run.duration, state, progress);
                }
                Err(err) => {
                    self.finish_failure(&step_ids[index], err.clone(), run.duration, state, progress);
                    failures[index] = Some(err);
                }
            }
        }

        // A task that never reported back still ends in a terminal state
        for (index, step) in ready.iter().enumerate() {
            if settled[index] {
                continue;
            }
            let err = StepError::ToolExecution {
                step_id: step.id.clone(),
                tool: step.tool.clone(),
                cause: "step task was cancelled".to_string(),
            };
            self.finish_failure(&step_ids[index], err.clone(), Duration::ZERO, state, progress);
            failures[index] = Some(err);
        }

        let failed = failures.iter().filter(|f| f.is_some()).count();
        self.event_log.emit(EventKind::WaveCompleted {
            wave,
            succeeded,
            failed,
            duration_ms: wave_started.elapsed().as_millis() as u64,
        });
        info!(wave, succeeded, failed, "wave completed");

        failures.into_iter().flatten().next().map(WaveError::from)
    }

    /// Record a success, then notify
    fn finish_success(
        &self,
        step_id: &Arc<str>,
        result: Value,
        duration: Duration,
        state: &ExecutionState,
        progress: &dyn ProgressReporter,
    ) {
        let duration_ms = duration.as_millis() as u64;
        debug!(step_id = %step_id, duration_ms, "step succeeded");

        let result = Arc::new(result);
        state.record_success(step_id, Arc::clone(&result), duration);
        self.event_log.emit(EventKind::StepSucceeded {
            step_id: Arc::clone(step_id),
            result: (*result).clone(),
            duration_ms,
        });
        report_progress(step_id, || {
            progress.on_step_finish(step_id, StepOutcome::Succeeded(&result))
        });
    }

    /// Record a failure, then notify
    fn finish_failure(
        &self,
        step_id: &Arc<str>,
        err: StepError,
        duration: Duration,
        state: &ExecutionState,
        progress: &dyn ProgressReporter,
    ) {
        let duration_ms = duration.as_millis() as u64;
        debug!(step_id = %step_id, duration_ms, error = %err, "step failed");

        state.record_failure(step_id, err.clone(), duration);
        self.event_log.emit(EventKind::StepFailed {
            step_id: Arc::clone(step_id),
            error: err.to_string(),
            duration_ms,
        });
        report_progress(step_id, || progress.on_step_finish(step_id, StepOutcome::Failed(&err)));
    }
}

/// Pending steps whose dependencies all succeeded, in plan order
fn ready_steps(plan: &Plan, state: &ExecutionState) -> Vec<Arc<Step>> {
    plan.steps
        .iter()
        .filter(|step| !state.contains(&step.id))
        .filter(|step| step.depends_on.iter().all(|dep| state.is_succeeded(dep)))
        .cloned()
        .collect()
}

/// Reporter errors and panics are logged, never propagated
fn report_progress(step_id: &str, notify: impl FnOnce() -> anyhow::Result<()>) {
    match std::panic::catch_unwind(AssertUnwindSafe(notify)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(step_id, error = %e, "progress reporter failed; ignoring"),
        Err(payload) => warn!(
            step_id,
            panic = %panic_message(payload),
            "progress reporter panicked; ignoring"
        ),
    }
}

/// Body of a spawned step task: slot → resolve → lookup → invoke → release
#[instrument(name = "step", skip_all, fields(step_id = %step.id, tool = %step.tool))]
async fn run_step(
    step: Arc<Step>,
    state: ExecutionState,
    registry: Arc<dyn ToolRegistry>,
    limiter: ConcurrencyLimiter,
) -> StepRun {
    let _permit = limiter.acquire().await;
    // Duration excludes time spent waiting for a slot
    let started = Instant::now();
    // Covers resolution and registry lookup as well as the tool itself
    let outcome = match AssertUnwindSafe(invoke_step(&step, &state, registry.as_ref()))
        .catch_unwind()
        .await
    {
        Ok(outcome) => outcome,
        Err(payload) => Err(StepError::ToolExecution {
            step_id: step.id.clone(),
            tool: step.tool.clone(),
            cause: format!("tool panicked: {}", panic_message(payload)),
        }),
    };
    StepRun {
        outcome,
        duration: started.elapsed(),
    }
}

async fn invoke_step(
    step: &Step,
    state: &ExecutionState,
    registry: &dyn ToolRegistry,
) -> Result<Value, StepError> {
    let args = resolve_args(&step.args, state).map_err(|source| StepError::Reference {
        step_id: step.id.clone(),
        source,
    })?;

    let tool = registry
        .lookup(&step.tool)
        .ok_or_else(|| StepError::ToolNotFound {
            step_id: step.id.clone(),
            tool: step.tool.clone(),
            available: registry.tool_ids(),
        })?;

    tool.invoke(args).await.map_err(|e| StepError::ToolExecution {
        step_id: step.id.clone(),
        tool: step.tool.clone(),
        cause: format!("{e:#}"),
    })
}

/// Run `plan` once with a fresh executor
///
/// A zero `max_concurrent` yields a report carrying a `Configuration`
/// error; nothing is invoked.
pub async fn execute(
    plan: &Plan,
    registry: Arc<dyn ToolRegistry>,
    max_concurrent: Option<usize>,
    progress: Option<&dyn ProgressReporter>,
) -> RunReport {
    let executor = Executor {
        registry,
        max_concurrent,
        event_log: EventLog::new(),
    };
    executor.run(plan, progress.unwrap_or(&NoopReporter)).await
}
