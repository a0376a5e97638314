//! Tool abstraction and registry
//!
//! A tool is anything that turns a resolved argument map into a JSON
//! result. Tools come in two flavours:
//! - async tools run on the runtime directly
//! - blocking tools run on tokio's blocking pool via `spawn_blocking`,
//!   so a long CPU-bound or synchronous call never stalls other steps
//!
//! The registry is read-only once a run starts.

use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

/// Resolved arguments handed to a tool
pub type ToolArgs = Map<String, Value>;

/// A callable capability identified by a tool id
///
/// # Example
/// ```rust,ignore
/// struct Upper;
///
/// #[async_trait]
/// impl Tool for Upper {
///     async fn invoke(&self, args: ToolArgs) -> anyhow::Result<Value> {
///         let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
///         Ok(Value::String(text.to_uppercase()))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    async fn invoke(&self, args: ToolArgs) -> Result<Value>;
}

/// Lookup from tool id to tool
pub trait ToolRegistry: Send + Sync {
    fn lookup(&self, tool_id: &str) -> Option<Arc<dyn Tool>>;

    /// Registered ids, sorted (used in error messages)
    fn tool_ids(&self) -> Vec<String>;
}

impl<R: ToolRegistry + ?Sized> ToolRegistry for Arc<R> {
    fn lookup(&self, tool_id: &str) -> Option<Arc<dyn Tool>> {
        (**self).lookup(tool_id)
    }

    fn tool_ids(&self) -> Vec<String> {
        (**self).tool_ids()
    }
}

/// Async closure tool
pub struct AsyncFnTool<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Tool for AsyncFnTool<F>
where
    F: Fn(ToolArgs) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    async fn invoke(&self, args: ToolArgs) -> Result<Value> {
        (self.f)(args).await
    }
}

/// Synchronous closure tool, isolated on the blocking pool
pub struct BlockingTool<F> {
    f: Arc<F>,
}

impl<F> BlockingTool<F>
where
    F: Fn(ToolArgs) -> Result<Value> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

#[async_trait]
impl<F> Tool for BlockingTool<F>
where
    F: Fn(ToolArgs) -> Result<Value> + Send + Sync + 'static,
{
    async fn invoke(&self, args: ToolArgs) -> Result<Value> {
        let f = Arc::clone(&self.f);
        match tokio::task::spawn_blocking(move || f(args)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(anyhow!("tool panicked: {}", panic_message(e.into_panic()))),
            Err(e) => Err(anyhow!("blocking task cancelled: {e}")),
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// In-memory registry keyed by tool id
#[derive(Clone, Default)]
pub struct ToolMap {
    tools: FxHashMap<String, Arc<dyn Tool>>,
}

impl ToolMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool (replaces any tool with the same id)
    pub fn register(&mut self, tool_id: impl Into<String>, tool: impl Tool + 'static) -> &mut Self {
        self.tools.insert(tool_id.into(), Arc::new(tool));
        self
    }

    pub fn register_arc(&mut self, tool_id: impl Into<String>, tool: Arc<dyn Tool>) -> &mut Self {
        self.tools.insert(tool_id.into(), tool);
        self
    }

    /// Register an async closure
    pub fn register_async<F, Fut>(&mut self, tool_id: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.register(tool_id, AsyncFnTool { f })
    }

    /// Register a synchronous closure; each call runs on the blocking pool
    pub fn register_blocking<F>(&mut self, tool_id: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(ToolArgs) -> Result<Value> + Send + Sync + 'static,
    {
        self.register(tool_id, BlockingTool::new(f))
    }

    #[inline]
    pub fn contains(&self, tool_id: &str) -> bool {
        self.tools.contains_key(tool_id)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl ToolRegistry for ToolMap {
    fn lookup(&self, tool_id: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(tool_id).cloned()
    }

    fn tool_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tools.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl std::fmt::Debug for ToolMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolMap")
            .field("tools", &self.tool_ids())
            .finish()
    }
}
