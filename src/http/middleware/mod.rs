//! Router middleware.

pub mod drain_gate;

pub use drain_gate::{drain_gate, RESTARTING_MESSAGE};
