//! Plan Validation - structural checks run before any tool is invoked
//!
//! Checks, in order (first failure wins):
//! 1. step ids are well-formed and unique
//! 2. every dependency names an existing step, listed once
//! 3. the dependency graph is acyclic
//! 4. every reference targets a step listed in `depends_on`

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::WaveError;
use crate::plan::{Plan, Step};

use super::graph::DependencyGraph;

/// Step ids: letters, digits, `_` and `-` (no dots, they separate reference segments)
static STEP_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+$").expect("step id pattern is a valid regex")
});

/// Validate a plan and return its dependency graph
pub fn validate_plan(plan: &Plan) -> Result<DependencyGraph, WaveError> {
    let ids = validate_step_ids(plan)?;

    for step in &plan.steps {
        validate_dependencies(step, &ids)?;
    }

    let graph = DependencyGraph::from_plan(plan);
    graph.detect_cycles()?;

    for step in &plan.steps {
        validate_references(step)?;
    }

    debug!(steps = plan.len(), "plan validated");
    Ok(graph)
}

/// Check id syntax and uniqueness, returning the id set
fn validate_step_ids(plan: &Plan) -> Result<FxHashSet<&str>, WaveError> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();

    for step in &plan.steps {
        if !STEP_ID_PATTERN.is_match(&step.id) {
            return Err(WaveError::malformed(
                &step.id,
                "step id must be non-empty and use only letters, digits, '_' or '-'",
            ));
        }
        if step.tool.trim().is_empty() {
            return Err(WaveError::malformed(&step.id, "tool id is empty"));
        }
        if !seen.insert(step.id.as_str()) {
            return Err(WaveError::malformed(&step.id, "duplicate step id"));
        }
    }

    Ok(seen)
}

fn validate_dependencies(step: &Step, ids: &FxHashSet<&str>) -> Result<(), WaveError> {
    let mut listed: FxHashSet<&str> = FxHashSet::default();

    for dep in &step.depends_on {
        if !listed.insert(dep.as_str()) {
            return Err(WaveError::malformed(
                &step.id,
                format!("dependency '{dep}' is listed more than once"),
            ));
        }
        if !ids.contains(dep.as_str()) {
            return Err(WaveError::malformed(
                &step.id,
                format!("depends on unknown step '{dep}'"),
            ));
        }
    }

    Ok(())
}

fn validate_references(step: &Step) -> Result<(), WaveError> {
    for (arg, expr) in step.references() {
        if !step.depends_on.iter().any(|d| d == expr.step_id()) {
            return Err(WaveError::malformed(
                &step.id,
                format!(
                    "argument '{arg}' references '{expr}' but '{}' is not in depends_on",
                    expr.step_id()
                ),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::RefExpr;

    fn assert_malformed(result: Result<DependencyGraph, WaveError>, step: &str, needle: &str) {
        match result {
            Err(WaveError::MalformedPlan { step_id, reason }) => {
                assert_eq!(step_id, step);
                assert!(reason.contains(needle), "reason was: {reason}");
            }
            Err(other) => panic!("expected MalformedPlan, got {other}"),
            Ok(_) => panic!("expected MalformedPlan, got Ok"),
        }
    }

    #[test]
    fn valid_plan_returns_graph() {
        let plan = Plan::new([
            Step::new("a", "echo").arg("value", 1),
            Step::new("b", "echo")
                .arg_ref("value", RefExpr::new("a", ["value"]))
                .depends_on(["a"]),
        ]);
        let graph = validate_plan(&plan).unwrap();
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn empty_plan_is_valid() {
        assert!(validate_plan(&Plan::default()).is_ok());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let plan = Plan::new([Step::new("a", "echo"), Step::new("a", "echo")]);
        assert_malformed(validate_plan(&plan), "a", "duplicate step id");
    }

    #[test]
    fn rejects_invalid_ids() {
        for bad in ["", "has.dot", "has space", "$a"] {
            let plan = Plan::new([Step::new(bad, "echo")]);
            assert_malformed(validate_plan(&plan), bad, "step id must be");
        }
    }

    #[test]
    fn rejects_empty_tool() {
        let plan = Plan::new([Step::new("a", " ")]);
        assert_malformed(validate_plan(&plan), "a", "tool id is empty");
    }

    #[test]
    fn rejects_unknown_dependency() {
        let plan = Plan::new([Step::new("a", "echo"), Step::new("b", "echo").depends_on(["z"])]);
        assert_malformed(validate_plan(&plan), "b", "unknown step 'z'");
    }

    #[test]
    fn rejects_duplicate_dependency() {
        let plan = Plan::new([
            Step::new("a", "echo"),
            Step::new("b", "echo").depends_on(["a", "a"]),
        ]);
        assert_malformed(validate_plan(&plan), "b", "more than once");
    }

    #[test]
    fn rejects_cycle() {
        let plan = Plan::new([
            Step::new("a", "echo").depends_on(["b"]),
            Step::new("b", "echo").depends_on(["a"]),
        ]);
        match validate_plan(&plan) {
            Err(WaveError::Cycle { cycle }) => assert_eq!(cycle, ["a", "b", "a"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn unknown_dependency_wins_over_cycle() {
        let plan = Plan::new([
            Step::new("a", "echo").depends_on(["b"]),
            Step::new("b", "echo").depends_on(["a", "ghost"]),
        ]);
        assert_malformed(validate_plan(&plan), "b", "ghost");
    }

    #[test]
    fn rejects_reference_outside_depends_on() {
        let plan = Plan::new([
            Step::new("a", "echo"),
            Step::new("b", "echo"),
            Step::new("c", "echo")
                .arg_ref("x", RefExpr::whole("b"))
                .depends_on(["a"]),
        ]);
        assert_malformed(validate_plan(&plan), "c", "'$b' but 'b' is not in depends_on");
    }
}
