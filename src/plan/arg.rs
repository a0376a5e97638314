//! Argument values - literals and references to upstream results
//!
//! In a plan document every argument is plain YAML/JSON. A string starting
//! with `$` becomes a [`RefExpr`]; `$$` escapes a literal dollar. Sequences
//! and mappings that contain references keep their shape so the resolver
//! can rebuild them after substitution.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::ReferenceError;

use super::reference::{RefExpr, REFERENCE_SIGIL};

/// Named arguments of a step
pub type Args = BTreeMap<String, ArgValue>;

/// A step argument: literal, reference, or a container holding references
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Passed to the tool unchanged
    Literal(Value),
    /// Replaced by (part of) an upstream result
    Reference(RefExpr),
    /// Sequence with at least one nested reference
    List(Vec<ArgValue>),
    /// Mapping with at least one nested reference
    Object(BTreeMap<String, ArgValue>),
}

impl ArgValue {
    /// Literal value (never interpreted as a reference)
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Convert a document value, recognising `$` references
    ///
    /// Containers without references collapse back into a single literal.
    pub fn from_value(value: Value) -> Result<Self, ReferenceError> {
        match value {
            Value::String(s) => {
                let escaped = format!("{REFERENCE_SIGIL}{REFERENCE_SIGIL}");
                if let Some(rest) = s.strip_prefix(&escaped) {
                    Ok(Self::Literal(Value::String(format!(
                        "{REFERENCE_SIGIL}{rest}"
                    ))))
                } else if let Some(body) = s.strip_prefix(REFERENCE_SIGIL) {
                    Ok(Self::Reference(RefExpr::parse(body)?))
                } else {
                    Ok(Self::Literal(Value::String(s)))
                }
            }
            Value::Array(items) => {
                let items = items
                    .into_iter()
                    .map(Self::from_value)
                    .collect::<Result<Vec<_>, _>>()?;
                if items.iter().all(Self::is_literal) {
                    Ok(Self::Literal(Value::Array(
                        items.into_iter().map(Self::into_literal).collect(),
                    )))
                } else {
                    Ok(Self::List(items))
                }
            }
            Value::Object(map) => {
                let entries = map
                    .into_iter()
                    .map(|(k, v)| Self::from_value(v).map(|v| (k, v)))
                    .collect::<Result<BTreeMap<_, _>, _>>()?;
                if entries.values().all(Self::is_literal) {
                    Ok(Self::Literal(Value::Object(
                        entries
                            .into_iter()
                            .map(|(k, v)| (k, v.into_literal()))
                            .collect(),
                    )))
                } else {
                    Ok(Self::Object(entries))
                }
            }
            other => Ok(Self::Literal(other)),
        }
    }

    /// Convert back to document form (references as `$...`, literal `$` escaped)
    pub fn to_value(&self) -> Value {
        match self {
            Self::Literal(value) => escape_literal(value),
            Self::Reference(expr) => Value::String(expr.to_string()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_value).collect()),
            Self::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect(),
            ),
        }
    }

    #[inline]
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Collect every reference nested in this value (document order)
    pub fn collect_references<'a>(&'a self, out: &mut Vec<&'a RefExpr>) {
        match self {
            Self::Literal(_) => {}
            Self::Reference(expr) => out.push(expr),
            Self::List(items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Self::Object(entries) => {
                for value in entries.values() {
                    value.collect_references(out);
                }
            }
        }
    }

    fn into_literal(self) -> Value {
        match self {
            Self::Literal(value) => value,
            // Only called once every item is known to be literal
            other => other.to_value(),
        }
    }
}

impl From<RefExpr> for ArgValue {
    fn from(expr: RefExpr) -> Self {
        Self::Reference(expr)
    }
}

impl From<Value> for ArgValue {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

fn escape_literal(value: &Value) -> Value {
    match value {
        Value::String(s) if s.starts_with(REFERENCE_SIGIL) => {
            Value::String(format!("{REFERENCE_SIGIL}{s}"))
        }
        Value::Array(items) => Value::Array(items.iter().map(escape_literal).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), escape_literal(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

impl Serialize for ArgValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ArgValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(D::Error::custom)
    }
}
