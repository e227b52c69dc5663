//! Error types for XA resource operations.
//!
//! Driver failures never cross the XA boundary as-is. They are translated into
//! [`XaError`] through the fixed table in [`DriverErrorKind::fault_code`], either
//! as [`XaError::ResourceUnavailable`] (a connection could not be opened) or as
//! [`XaError::ResourceFault`] (a physical operation failed on an open one).

use std::fmt;
use std::io;

use thiserror::Error;

use crate::xa::{
    XAER_PROTO, XAER_RMERR, XAER_RMFAIL, XA_RBDEADLOCK, XA_RBINTEGRITY, XA_RBROLLBACK,
};

/// The main error type surfaced across the XA boundary.
#[derive(Debug, Error)]
pub enum XaError {
    /// Xid mismatch, double start, missing branch or an unexpected call.
    ///
    /// Always a local integration bug; never retried.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The backing resource could not be reached.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// A physical operation failed against an open connection.
    #[error("resource fault (code {code}): {message}")]
    ResourceFault {
        /// XA error code from the driver error mapping table.
        code: i32,
        /// Human readable description of the failure.
        message: String,
    },

    /// The operation is not legal in the current transaction state.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// The transaction was rolled back instead of committed.
    #[error("transaction rolled back: {0}")]
    RolledBack(String),

    /// A participant completed heuristically.
    #[error("heuristic outcome (code {code}): {message}")]
    Heuristic {
        /// One of the `XA_HEUR*` return codes.
        code: i32,
        /// Human readable description of the outcome.
        message: String,
    },

    /// Invalid resource configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl XaError {
    /// Shorthand for [`XaError::Protocol`].
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Translates a failure to open a connection.
    pub fn unavailable(context: &str, cause: DriverError) -> Self {
        Self::ResourceUnavailable(format!("{}: {}", context, cause))
    }

    /// Translates a failure of a physical operation through the mapping table.
    pub fn fault(context: &str, cause: DriverError) -> Self {
        Self::ResourceFault {
            code: cause.kind().fault_code(),
            message: format!("{}: {}", context, cause),
        }
    }

    /// Returns the XA code a coordinator would see for this error.
    pub fn xa_code(&self) -> i32 {
        match self {
            Self::Protocol(_) | Self::IllegalState(_) => XAER_PROTO,
            Self::ResourceUnavailable(_) => XAER_RMFAIL,
            Self::ResourceFault { code, .. } | Self::Heuristic { code, .. } => *code,
            Self::RolledBack(_) => XA_RBROLLBACK,
            Self::Configuration(_) => XAER_RMERR,
        }
    }

    /// Returns true for errors caused by misuse of the XA protocol.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}

/// A specialized `Result` type for XA operations.
pub type Result<T> = std::result::Result<T, XaError>;

/// Failure categories reported by resource drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverErrorKind {
    /// The resource refused the connection.
    ConnectionRefused,
    /// An established connection broke.
    ConnectionLost,
    /// The connection was already closed.
    Closed,
    /// The driver gave up waiting.
    Timeout,
    /// The resource detected a deadlock.
    Deadlock,
    /// A constraint or integrity check failed.
    Integrity,
    /// The resource rolled the work back on its own.
    RolledBack,
    /// The driver does not support the requested call.
    Unsupported,
    /// Anything else.
    Other,
}

impl DriverErrorKind {
    /// Maps the failure category to the XA code reported to the coordinator.
    pub fn fault_code(self) -> i32 {
        match self {
            Self::ConnectionRefused | Self::ConnectionLost | Self::Closed | Self::Timeout => {
                XAER_RMFAIL
            }
            Self::Deadlock => XA_RBDEADLOCK,
            Self::Integrity => XA_RBINTEGRITY,
            Self::RolledBack => XA_RBROLLBACK,
            Self::Unsupported => XAER_PROTO,
            Self::Other => XAER_RMERR,
        }
    }
}

impl From<io::ErrorKind> for DriverErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => Self::ConnectionRefused,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => Self::ConnectionLost,
            io::ErrorKind::NotConnected => Self::Closed,
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout,
            io::ErrorKind::Unsupported => Self::Unsupported,
            _ => Self::Other,
        }
    }
}

/// An error raised by a resource driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    kind: DriverErrorKind,
    message: String,
}

impl DriverError {
    /// Creates a new driver error.
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the failure category.
    pub fn kind(&self) -> DriverErrorKind {
        self.kind
    }

    /// Returns the driver's message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for DriverError {}

impl From<io::Error> for DriverError {
    fn from(err: io::Error) -> Self {
        Self::new(err.kind().into(), err.to_string())
    }
}

/// A specialized `Result` type for driver calls.
pub type DriverResult<T> = std::result::Result<T, DriverError>;
