//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, graceful close)
//!     → Hand off to HTTP layer (gate, handlers)
//!     → connection.rs (in-flight request tracking)
//! ```
//!
//! # Design Decisions
//! - The serve loop runs on its own task; the handle owns the shutdown trigger
//! - Closing stops accepting first, then waits for in-flight requests

pub mod connection;
pub mod listener;

pub use connection::ConnectionTracker;
pub use listener::{HttpListener, Listener, ListenerError, ServingHandle};
