//! Error types of the bridge.
//!
//! The `Display` text of a [`DapError`] is exactly what the client sees in
//! the `body.error` field of a failed response.

use thiserror::Error;

/// Result type for bridge operations.
pub type DapResult<T> = Result<T, DapError>;

/// An error surfaced to the client as a failed response.
#[derive(Debug, Error)]
pub enum DapError {
    /// The envelope is not a request or has no command.
    #[error("Invalid request format")]
    InvalidRequest,

    /// No handler is registered for the command.
    #[error("Unknown command {0}")]
    UnknownCommand(String),

    /// The request arguments could not be deserialized.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),

    /// The command requires an attached session.
    #[error("Debugger not attached")]
    NotAttached,

    /// The command requires a paused frame.
    #[error("No current frame available")]
    NoCurrentFrame,

    /// The paused frame has been popped or terminated.
    #[error("Current frame is not on stack or is terminated")]
    FrameNotLive,

    /// The frame id does not name a live frame of the paused stack.
    #[error("Invalid frameId")]
    InvalidFrameId(i64),

    /// The source reference is out of range.
    #[error("Invalid source reference")]
    InvalidSourceReference(i64),

    /// `setBreakpoints` without a source path.
    #[error("Invalid source path or name")]
    MissingSourcePath,

    /// `evaluate` without an expression.
    #[error("No expression provided for evaluation")]
    MissingExpression,

    /// The expression threw or was terminated.
    #[error("Error evaluating expression: {0}")]
    Evaluation(String),

    /// The engine refused an operation.
    #[error("Engine error: {0}")]
    Host(#[from] HostError),

    /// A handler or hook panicked.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// An error reported by the native debugging primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HostError {
    message: String,
}

impl HostError {
    /// Creates a new host error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
