//! Binding Module - data flow between steps
//!
//! Data flow:
//! ```text
//! plan args (ArgValue)            ExecutionState
//!        │                               │ succeeded results
//!        └──────────► resolve ◄──────────┘
//!                        │
//!                        ▼
//!              tool args (JSON map)
//! ```

mod resolve;

pub use resolve::{resolve_args, resolve_reference, resolve_value, traverse};
