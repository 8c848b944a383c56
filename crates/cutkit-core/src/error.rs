//! Error handling for CutKit
//!
//! Provides the error types for the fallible layers of the engine:
//! - Controller errors (the machine collaborator refused or lost a command)
//! - Format errors (the line-oriented document encoding)
//! - Execution errors (a streaming run aborted)
//!
//! Geometry operations do not use these types. An invalid geometric request
//! is answered with `false` or `None` so interactive callers can retry.

use crate::data::ControllerState;
use thiserror::Error;

/// Controller error type
///
/// Raised by a machine controller implementation when it cannot accept or
/// carry out a request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControllerError {
    /// Controller is not connected
    #[error("Controller not connected")]
    NotConnected,

    /// Command was rejected by controller
    #[error("Command rejected: {reason}")]
    CommandRejected {
        /// The reason the command was rejected.
        reason: String,
    },

    /// The command queue could not take another line
    #[error("Command queue failure: {message}")]
    QueueFailure {
        /// A message describing the queue failure.
        message: String,
    },

    /// The controller reported an error state such as an alarm
    #[error("Controller entered {state} state")]
    Faulted {
        /// The state that was reported.
        state: ControllerState,
    },

    /// Soft reset did not complete
    #[error("Soft reset failed: {reason}")]
    ResetFailed {
        /// The reason the reset failed.
        reason: String,
    },

    /// Command log could not be opened or written
    #[error("Command logger error: {reason}")]
    Logger {
        /// The reason for the logger failure.
        reason: String,
    },

    /// Generic controller error
    #[error("Controller error: {message}")]
    Other {
        /// The error message.
        message: String,
    },
}

/// Document format error type
///
/// Represents structural problems in the line-oriented document encoding.
/// Individual unparseable motion lines are not errors; they are kept as
/// comments. Only broken group structure is fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    /// A line that could not be interpreted at all
    #[error("Malformed line {line_number}: {reason}")]
    MalformedLine {
        /// 1-based line number in the input.
        line_number: usize,
        /// The reason the line was rejected.
        reason: String,
    },

    /// An end-group header with no open group
    #[error("Unmatched group end at line {line_number}")]
    UnmatchedGroupEnd {
        /// 1-based line number in the input.
        line_number: usize,
    },

    /// Input ended while one or more groups were still open
    #[error("Unterminated group '{name}' ({open} still open at end of input)")]
    UnterminatedGroup {
        /// Name of the innermost open group.
        name: String,
        /// Number of groups still open.
        open: usize,
    },

    /// Input contained no shape header
    #[error("Document is empty")]
    EmptyDocument,

    /// A properties block that does not have the expected field count
    #[error("Invalid properties block at line {line_number}: {reason}")]
    InvalidProperties {
        /// 1-based line number in the input.
        line_number: usize,
        /// The reason the block was rejected.
        reason: String,
    },
}

/// Execution error type
///
/// Represents the ways a document run can end early.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// The controller failed while streaming
    #[error("Controller failure during execution: {0}")]
    Controller(#[from] ControllerError),

    /// The cooperative stop flag was raised
    #[error("Execution stopped by request")]
    Stopped,

    /// The shape being executed disappeared from the live document
    #[error("Shape {id} is no longer part of the document")]
    ShapeVanished {
        /// Id of the missing shape.
        id: u64,
    },

    /// The resolved depth schedule of a shape or group is unbounded
    #[error("'{name}' requests more than {limit} passes")]
    TooManyPasses {
        /// Name of the shape or group.
        name: String,
        /// The pass cap that was exceeded.
        limit: usize,
    },

    /// Another run is still active on this executor
    #[error("Execution already running")]
    AlreadyRunning,
}

/// Main error type for CutKit operations
///
/// Unified error type that can represent any error from the library.
#[derive(Error, Debug)]
pub enum Error {
    /// Controller error
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// Format error
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Execution error
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a document format error
    pub fn is_format_error(&self) -> bool {
        matches!(self, Error::Format(_))
    }

    /// Check if this is a controller error, directly or through a failed run
    pub fn is_controller_error(&self) -> bool {
        matches!(
            self,
            Error::Controller(_) | Error::Execution(ExecutionError::Controller(_))
        )
    }

    /// Check if this error only records a cooperative stop
    pub fn is_stop(&self) -> bool {
        matches!(self, Error::Execution(ExecutionError::Stopped))
    }
}

/// Result type for CutKit operations
pub type Result<T> = std::result::Result<T, Error>;
