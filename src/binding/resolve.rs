//! Argument Resolution - substitute references with upstream results
//!
//! Resolution is pure: it reads succeeded results from the
//! [`ExecutionState`] and never mutates anything. Any failure is reported
//! as a [`ReferenceError`] naming the offending expression.

use serde_json::{Map, Value};

use crate::error::ReferenceError;
use crate::plan::{ArgValue, Args, RefExpr};
use crate::store::ExecutionState;

/// Resolve a step's named arguments into the map handed to its tool
pub fn resolve_args(args: &Args, state: &ExecutionState) -> Result<Map<String, Value>, ReferenceError> {
    let mut resolved = Map::new();
    for (name, value) in args {
        resolved.insert(name.clone(), resolve_value(value, state)?);
    }
    Ok(resolved)
}

/// Resolve one argument value (recursing into lists and objects)
pub fn resolve_value(value: &ArgValue, state: &ExecutionState) -> Result<Value, ReferenceError> {
    match value {
        ArgValue::Literal(literal) => Ok(literal.clone()),
        ArgValue::Reference(expr) => resolve_reference(expr, state),
        ArgValue::List(items) => items
            .iter()
            .map(|item| resolve_value(item, state))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        ArgValue::Object(entries) => entries
            .iter()
            .map(|(k, v)| resolve_value(v, state).map(|v| (k.clone(), v)))
            .collect::<Result<Map<_, _>, _>>()
            .map(Value::Object),
    }
}

/// Resolve a single reference against succeeded results
pub fn resolve_reference(expr: &RefExpr, state: &ExecutionState) -> Result<Value, ReferenceError> {
    let root = state
        .result(expr.step_id())
        .ok_or_else(|| ReferenceError::NotSucceeded {
            step_id: expr.step_id().to_string(),
            expr: expr.to_string(),
        })?;

    traverse(&root, expr).cloned()
}

/// Walk `expr`'s path through `root`
///
/// Mapping segments are keys; sequence segments are decimal indices.
pub fn traverse<'v>(root: &'v Value, expr: &RefExpr) -> Result<&'v Value, ReferenceError> {
    let mut current = root;

    for segment in expr.path() {
        current = match current {
            Value::Object(map) => map.get(segment).ok_or_else(|| ReferenceError::MissingKey {
                expr: expr.to_string(),
                segment: segment.clone(),
            })?,
            Value::Array(items) => {
                let index = parse_index(segment).ok_or_else(|| ReferenceError::InvalidIndex {
                    expr: expr.to_string(),
                    segment: segment.clone(),
                })?;
                items.get(index).ok_or_else(|| ReferenceError::IndexOutOfRange {
                    expr: expr.to_string(),
                    index,
                    len: items.len(),
                })?
            }
            scalar => {
                return Err(ReferenceError::NotComposite {
                    expr: expr.to_string(),
                    segment: segment.clone(),
                    value_type: value_type(scalar).to_string(),
                })
            }
        };
    }

    Ok(current)
}

/// Decimal digits only (no sign, no whitespace)
fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn state_with(results: &[(&str, Value)]) -> ExecutionState {
        let state = ExecutionState::new();
        for (id, value) in results {
            state.mark_running((*id).into(), 0);
            state.record_success(id, Arc::new(value.clone()), Duration::ZERO);
        }
        state
    }

    #[test]
    fn resolves_nested_key() {
        let state = state_with(&[("A", json!({"value": {"sub": 42}}))]);
        let value = resolve_reference(&RefExpr::new("A", ["value", "sub"]), &state).unwrap();
        assert_eq!(value, json!(42));
    }

    #[test]
    fn resolves_whole_result() {
        let state = state_with(&[("A", json!([1, 2]))]);
        let value = resolve_reference(&RefExpr::whole("A"), &state).unwrap();
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn resolves_sequence_index() {
        let state = state_with(&[("list", json!({"items": [{"name": "x"}, {"name": "y"}]}))]);
        let value = resolve_reference(&RefExpr::new("list", ["items", "1", "name"]), &state).unwrap();
        assert_eq!(value, json!("y"));
    }

    #[test]
    fn missing_key_names_expression() {
        let state = state_with(&[("A", json!({"value": {}}))]);
        let err = resolve_reference(&RefExpr::new("A", ["value", "sub"]), &state).unwrap_err();
        assert_eq!(
            err,
            ReferenceError::MissingKey {
                expr: "$A.value.sub".into(),
                segment: "sub".into(),
            }
        );
    }

    #[test]
    fn index_errors() {
        let state = state_with(&[("A", json!([10, 20]))]);

        let err = resolve_reference(&RefExpr::new("A", ["2"]), &state).unwrap_err();
        assert_eq!(
            err,
            ReferenceError::IndexOutOfRange {
                expr: "$A.2".into(),
                index: 2,
                len: 2,
            }
        );

        for bad in ["first", "-1", "+1"] {
            let err = resolve_reference(&RefExpr::new("A", [bad]), &state).unwrap_err();
            assert!(matches!(err, ReferenceError::InvalidIndex { .. }), "{bad}");
        }
    }

    #[test]
    fn scalar_cannot_be_traversed() {
        let state = state_with(&[("A", json!({"n": 5}))]);
        let err = resolve_reference(&RefExpr::new("A", ["n", "x"]), &state).unwrap_err();
        match err {
            ReferenceError::NotComposite { value_type, .. } => assert_eq!(value_type, "number"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unfinished_step_is_not_resolvable() {
        let state = ExecutionState::new();
        state.mark_running("A".into(), 0);
        let err = resolve_reference(&RefExpr::whole("A"), &state).unwrap_err();
        assert!(matches!(err, ReferenceError::NotSucceeded { .. }));
    }

    #[test]
    fn resolves_nested_containers() {
        let state = state_with(&[("a", json!({"x": 1})), ("b", json!(["p", "q"]))]);
        let arg = ArgValue::from_value(json!({"pair": ["$a.x", "$b.1"], "lit": true})).unwrap();
        assert_eq!(
            resolve_value(&arg, &state).unwrap(),
            json!({"pair": [1, "q"], "lit": true})
        );
    }

    #[test]
    fn resolve_args_keeps_names() {
        let state = state_with(&[("a", json!({"x": 1}))]);
        let mut args = Args::new();
        args.insert("lit".into(), ArgValue::literal("$not-a-ref"));
        args.insert("val".into(), ArgValue::Reference(RefExpr::new("a", ["x"])));

        let resolved = resolve_args(&args, &state).unwrap();
        assert_eq!(resolved["lit"], json!("$not-a-ref"));
        assert_eq!(resolved["val"], json!(1));
    }
}
