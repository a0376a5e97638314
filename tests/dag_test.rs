//! DAG Integration Tests
//!
//! Plans parsed from YAML, then validated into a dependency graph.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use wavefront::{validate_plan, Plan, WaveError};

fn ids(wave: &[Arc<str>]) -> Vec<&str> {
    wave.iter().map(AsRef::as_ref).collect()
}

fn graph_for(yaml: &str) -> wavefront::DependencyGraph {
    let plan = Plan::from_yaml_str(yaml).expect("plan parses");
    validate_plan(&plan).expect("plan is valid")
}

// ═══════════════════════════════════════════════════════════════
// SHAPES
// ═══════════════════════════════════════════════════════════════

#[test]
fn diamond_has_three_waves() {
    let graph = graph_for(
        r#"
steps:
  - { id: source, tool: echo }
  - { id: left, tool: echo, depends_on: [source] }
  - { id: right, tool: echo, depends_on: [source] }
  - { id: sink, tool: echo, depends_on: [left, right] }
"#,
    );

    let waves = graph.waves();
    assert_eq!(waves.len(), 3);
    assert_eq!(ids(&waves[0]), ["source"]);
    assert_eq!(ids(&waves[1]), ["left", "right"]);
    assert_eq!(ids(&waves[2]), ["sink"]);

    assert!(graph.has_path("source", "sink"));
    assert!(!graph.has_path("left", "right"));
    assert_eq!(ids(&graph.roots()), ["source"]);
    assert_eq!(ids(&graph.leaves()), ["sink"]);
}

#[test]
fn waves_follow_plan_order() {
    let graph = graph_for(
        r#"
steps:
  - { id: z, tool: echo }
  - { id: a, tool: echo }
  - { id: m, tool: echo, depends_on: [z] }
"#,
    );

    let waves = graph.waves();
    assert_eq!(ids(&waves[0]), ["z", "a"]);
    assert_eq!(ids(&waves[1]), ["m"]);
}

#[test]
fn dependencies_and_dependents_mirror() {
    let graph = graph_for(
        r#"
steps:
  - { id: a, tool: echo }
  - { id: b, tool: echo }
  - { id: c, tool: echo, depends_on: [a, b] }
"#,
    );

    assert_eq!(ids(graph.dependencies("c")), ["a", "b"]);
    assert_eq!(ids(graph.dependents("a")), ["c"]);
    assert!(graph.dependencies("a").is_empty());
    assert!(graph.dependents("missing").is_empty());
}

// ═══════════════════════════════════════════════════════════════
// REJECTED PLANS
// ═══════════════════════════════════════════════════════════════

#[test]
fn three_step_cycle_is_reported() {
    let plan = Plan::from_yaml_str(
        r#"
steps:
  - { id: a, tool: echo, depends_on: [c] }
  - { id: b, tool: echo, depends_on: [a] }
  - { id: c, tool: echo, depends_on: [b] }
"#,
    )
    .unwrap();

    match validate_plan(&plan) {
        Err(WaveError::Cycle { cycle }) => {
            assert_eq!(cycle.len(), 4);
            assert_eq!(cycle.first(), cycle.last());
            for id in ["a", "b", "c"] {
                assert!(cycle.iter().any(|s| s == id));
            }
        }
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[test]
fn self_dependency_is_a_cycle() {
    let plan = Plan::from_yaml_str("steps:\n  - { id: a, tool: echo, depends_on: [a] }\n").unwrap();
    let err = validate_plan(&plan).unwrap_err();
    assert_eq!(err.code(), "WAVE-002");
}

#[test]
fn reference_outside_depends_on_is_malformed() {
    let plan = Plan::from_yaml_str(
        r#"
steps:
  - { id: a, tool: echo }
  - { id: b, tool: echo }
  - id: c
    tool: echo
    args:
      nested: [1, { deep: $b.value }]
    depends_on: [a]
"#,
    )
    .unwrap();

    let err = validate_plan(&plan).unwrap_err();
    assert!(matches!(err, WaveError::MalformedPlan { ref step_id, .. } if step_id == "c"));
    assert!(err.to_string().contains("'$b.value'"));
    assert!(err.is_structural());
}

#[test]
fn unknown_dependency_is_malformed() {
    let plan = Plan::from_yaml_str("steps:\n  - { id: a, tool: echo, depends_on: [ghost] }\n").unwrap();
    let err = validate_plan(&plan).unwrap_err();
    assert!(err.to_string().contains("unknown step 'ghost'"));
}

#[test]
fn step_id_with_dot_is_malformed() {
    let plan = Plan::from_yaml_str("steps:\n  - { id: a.b, tool: echo }\n").unwrap();
    let err = validate_plan(&plan).unwrap_err();
    assert_eq!(err.code(), "WAVE-001");
}

#[test]
fn escaped_dollar_is_not_a_reference() {
    let graph = graph_for(
        r#"
steps:
  - id: a
    tool: echo
    args: { price: $$5 }
"#,
    );
    assert_eq!(graph.len(), 1);
}
