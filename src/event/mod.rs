//! Event module - append-only audit trail of a run

mod log;

pub use log::{Event, EventKind, EventLog};
