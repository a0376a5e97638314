//! Reference expressions - `$step_id.path.to.field`
//!
//! A reference names an upstream step and an optional path into its result.
//! Segments are applied one at a time: a mapping is indexed by key, a
//! sequence by a non-negative decimal index.
//!
//! Document encoding:
//! - `$fetch` → whole result of `fetch`
//! - `$fetch.items.0.name` → nested field
//! - `$$literal` → the literal string `$literal` (not a reference)

use std::fmt;

use crate::error::ReferenceError;

/// Leading character that marks a string argument as a reference
pub const REFERENCE_SIGIL: char = '$';

/// Parsed reference: target step plus path segments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefExpr {
    step_id: String,
    path: Vec<String>,
}

impl RefExpr {
    /// Build a reference from already-split parts
    pub fn new<I, S>(step_id: impl Into<String>, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            step_id: step_id.into(),
            path: path.into_iter().map(Into::into).collect(),
        }
    }

    /// Reference to the whole result of a step
    pub fn whole(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            path: Vec::new(),
        }
    }

    /// Parse the body of a reference (without the leading `$`)
    ///
    /// ```
    /// use wavefront::plan::RefExpr;
    ///
    /// let expr = RefExpr::parse("fetch.items.0").unwrap();
    /// assert_eq!(expr.step_id(), "fetch");
    /// assert_eq!(expr.path(), ["items", "0"]);
    /// ```
    pub fn parse(body: &str) -> Result<Self, ReferenceError> {
        let mut parts = body.split('.');

        let step_id = parts.next().unwrap_or_default();
        if step_id.is_empty() {
            return Err(ReferenceError::Syntax {
                expr: format!("{REFERENCE_SIGIL}{body}"),
                reason: "missing step id".to_string(),
            });
        }

        let mut path = Vec::new();
        for segment in parts {
            if segment.is_empty() {
                return Err(ReferenceError::Syntax {
                    expr: format!("{REFERENCE_SIGIL}{body}"),
                    reason: "empty path segment".to_string(),
                });
            }
            path.push(segment.to_string());
        }

        Ok(Self {
            step_id: step_id.to_string(),
            path,
        })
    }

    /// Step whose result this reference reads
    #[inline]
    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    /// Path segments applied to the step result
    #[inline]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// True when the reference selects the whole result
    #[inline]
    pub fn is_whole(&self) -> bool {
        self.path.is_empty()
    }
}

impl fmt::Display for RefExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{REFERENCE_SIGIL}{}", self.step_id)?;
        for segment in &self.path {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}
