//! Plan Types - steps and the plan that owns them
//!
//! Contains the YAML/JSON-parsed types:
//! - `Step`: one tool invocation with arguments and dependencies
//! - `Plan`: ordered steps plus an optional rationale
//!
//! Parsing never validates structure; call [`crate::dag::validate_plan`]
//! (or run it through the executor) before trusting a plan.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

use super::arg::{ArgValue, Args};
use super::reference::RefExpr;

/// One unit of work: call `tool` with `args` once `depends_on` succeeded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    pub id: String,
    pub tool: String,
    #[serde(default, skip_serializing_if = "Args::is_empty")]
    pub args: Args,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl Step {
    pub fn new(id: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool: tool.into(),
            args: Args::new(),
            depends_on: Vec::new(),
        }
    }

    /// Add a literal argument
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(name.into(), ArgValue::Literal(value.into()));
        self
    }

    /// Add an argument bound to an upstream result
    pub fn arg_ref(mut self, name: impl Into<String>, expr: RefExpr) -> Self {
        self.args.insert(name.into(), ArgValue::Reference(expr));
        self
    }

    /// Add an arbitrary argument value (nested references allowed)
    pub fn arg_value(mut self, name: impl Into<String>, value: ArgValue) -> Self {
        self.args.insert(name.into(), value);
        self
    }

    /// Append dependencies
    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Every reference in the arguments, paired with its argument name
    pub fn references(&self) -> Vec<(&str, &RefExpr)> {
        let mut out = Vec::new();
        for (name, value) in &self.args {
            let mut refs = Vec::new();
            value.collect_references(&mut refs);
            out.extend(refs.into_iter().map(|r| (name.as_str(), r)));
        }
        out
    }
}

/// Plan parsed from a document (raw)
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanRaw {
    #[serde(default)]
    rationale: Option<String>,
    #[serde(default)]
    steps: Vec<Step>,
}

/// Borrowed view used for serialization
#[derive(Serialize)]
struct PlanDoc<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    rationale: Option<&'a str>,
    steps: Vec<&'a Step>,
}

/// Plan with Arc-wrapped steps for cheap hand-off to spawned tasks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    /// Free-form explanation carried along for display only
    pub rationale: Option<String>,
    pub steps: Vec<Arc<Step>>,
}

impl<'de> Deserialize<'de> for Plan {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = PlanRaw::deserialize(deserializer)?;
        Ok(Plan {
            rationale: raw.rationale,
            steps: raw.steps.into_iter().map(Arc::new).collect(),
        })
    }
}

impl Serialize for Plan {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        PlanDoc {
            rationale: self.rationale.as_deref(),
            steps: self.steps.iter().map(AsRef::as_ref).collect(),
        }
        .serialize(serializer)
    }
}

impl Plan {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            rationale: None,
            steps: steps.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a file; `.json` is parsed as JSON, anything else as YAML
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_str_for_path(&content, path)
    }

    /// Parse `content` in the format implied by `path`'s extension
    pub fn from_str_for_path(content: &str, path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(content),
            _ => Self::from_yaml_str(content),
        }
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Look up a step by id (linear scan; plans are small)
    pub fn step(&self, id: &str) -> Option<&Arc<Step>> {
        self.steps.iter().find(|s| s.id == id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
