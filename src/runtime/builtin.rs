//! Built-in tools available to the CLI
//!
//! | id | behaviour |
//! |----|-----------|
//! | `echo` | returns its arguments as a mapping |
//! | `sleep` | blocks for `ms` milliseconds, then returns its arguments |
//! | `fail` | fails with `message` |
//! | `count` | length of `items` (sequence, mapping or string) |

use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use serde_json::{json, Value};

use super::registry::{ToolArgs, ToolMap};

/// Registry with every built-in tool
pub fn builtin_tools() -> ToolMap {
    let mut tools = ToolMap::new();
    tools
        .register_async("echo", |args| async move { echo(args) })
        .register_blocking("sleep", sleep)
        .register_async("fail", |args| async move { fail(args) })
        .register_async("count", |args| async move { count(args) });
    tools
}

fn echo(args: ToolArgs) -> Result<Value> {
    Ok(Value::Object(args))
}

/// Runs on the blocking pool, so a plain thread sleep is fine here
fn sleep(args: ToolArgs) -> Result<Value> {
    let ms = match args.get("ms") {
        None => 0,
        Some(value) => value
            .as_u64()
            .ok_or_else(|| anyhow!("'ms' must be a non-negative integer, got {value}"))?,
    };
    std::thread::sleep(Duration::from_millis(ms));
    Ok(Value::Object(args))
}

fn fail(args: ToolArgs) -> Result<Value> {
    let message = args
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("failed on purpose");
    bail!("{message}")
}

fn count(args: ToolArgs) -> Result<Value> {
    let len = match args.get("items") {
        Some(Value::Array(items)) => items.len(),
        Some(Value::Object(map)) => map.len(),
        Some(Value::String(s)) => s.chars().count(),
        Some(other) => bail!("'items' must be a sequence, mapping or string, got {other}"),
        None => bail!("missing argument 'items'"),
    };
    Ok(json!({ "count": len }))
}
