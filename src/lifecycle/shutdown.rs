//! Shutdown outcome.

use std::time::Duration;

/// How long `stop` waits for the listener to drain and the store to close.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of a shutdown attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Listener drained and store closed within the deadline.
    Completed,
    /// The deadline fired first, or draining failed; resources were abandoned.
    TimedOut,
}

impl DrainOutcome {
    /// Process exit code for this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            DrainOutcome::Completed => 0,
            DrainOutcome::TimedOut => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DrainOutcome::Completed => "completed",
            DrainOutcome::TimedOut => "timed_out",
        }
    }
}
