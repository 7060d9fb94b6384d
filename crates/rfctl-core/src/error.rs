//! Error types for rfctl.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Connection-establishment failures,
//! transient exchange failures, precondition violations, and the raw
//! transport-layer failures they are built from are all captured here.

use std::fmt;

use crate::types::Endpoint;

/// The background activity a precondition error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activity {
    /// The periodic status poller.
    Poller,
    /// The stepped frequency sweep.
    Sweep,
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activity::Poller => write!(f, "poller"),
            Activity::Sweep => write!(f, "sweep"),
        }
    }
}

/// The error type for all rfctl operations.
///
/// The first group of variants is what controller callers see. The second
/// group is produced by [`Transport`](crate::transport::Transport)
/// implementations and folded into `TxFailed` / `RxFailed` by the
/// command/response channel.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Discovery returned no candidate endpoints and none was given.
    #[error("no endpoints available")]
    NoEndpointsAvailable,

    /// Opening the transport to `endpoint` failed.
    #[error("failed to open {endpoint}: {detail}")]
    TransportOpenFailed {
        /// The endpoint that could not be opened.
        endpoint: Endpoint,
        /// Underlying I/O message.
        detail: String,
    },

    /// Writing a command line failed.
    #[error("TX failed: {0}")]
    TxFailed(String),

    /// Reading a response line failed.
    #[error("RX failed: {0}")]
    RxFailed(String),

    /// The activity is already running for this session.
    #[error("{0} already running")]
    AlreadyRunning(Activity),

    /// No transport is open.
    #[error("not connected")]
    NotConnected,

    /// Sweep or poll parameters were rejected.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// A transport-level error (serial port configuration, device gone).
    #[error("transport error: {0}")]
    Transport(String),

    /// A transport-level write did not complete within its timeout.
    #[error("timeout waiting for transport")]
    Timeout,

    /// The link to the instrument was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
