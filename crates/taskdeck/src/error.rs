//! Error taxonomy for discovery, matching, and execution
//!
//! The executor never lets any of these escape to callers: every variant
//! terminates in a well-formed `CommandResult` carrying the message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    /// Unknown command name - reported, not fatal
    #[error("Command not found: {0}")]
    NotFound(String),

    /// Metadata extraction failed for one handler - logged, discovery continues
    #[error("Failed to load command metadata from {path}: {reason}")]
    Load { path: String, reason: String },

    /// Worker process could not be started
    #[error("Failed to spawn worker: {0}")]
    Spawn(String),

    /// Handler returned an error or the worker exited nonzero
    #[error("Command execution failed: {0}")]
    Execution(String),

    /// A trigger regex failed to compile - skipped for that one pattern
    #[error("Invalid trigger pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
