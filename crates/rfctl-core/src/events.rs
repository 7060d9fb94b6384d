//! Controller event types.
//!
//! Events are emitted by the controller through a `tokio::sync::broadcast`
//! channel. Presentation code subscribes to them to render a live log and
//! connection/sweep status without polling the transport itself.

use std::time::Duration;

use crate::types::{Endpoint, ResponseLine, SweepParameters};

/// An event emitted by the controller.
///
/// Subscribe via `RfController::subscribe()`. Events are delivered on a
/// best-effort basis through a bounded broadcast channel; slow consumers
/// may miss events during a fast sweep.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// A transport was opened.
    Connected {
        /// The endpoint now in use.
        endpoint: Endpoint,
    },

    /// `connect` failed; the session remains disconnected.
    ConnectFailed {
        /// One-line diagnostic.
        reason: String,
    },

    /// Activities were stopped and the transport closed.
    Disconnected,

    /// The status poller began cycling.
    PollingStarted {
        /// Time between status queries.
        interval: Duration,
    },

    /// The status poller exited.
    PollingStopped,

    /// A line received by the status poller.
    Status {
        /// The raw, trimmed line.
        line: ResponseLine,
    },

    /// A sweep run began.
    SweepStarted {
        /// The validated parameters of this run.
        params: SweepParameters,
    },

    /// The sweep commanded a new frequency.
    SweepStep {
        /// Frequency just sent, in hertz.
        freq_hz: f64,
    },

    /// The sweep reached the stop frequency.
    SweepCompleted {
        /// Number of set-frequency commands issued.
        steps: u64,
    },

    /// The sweep was cancelled.
    SweepStopped {
        /// Last frequency commanded, if any.
        last_hz: Option<f64>,
    },

    /// Writing a command failed. The session stays up.
    TxFailed {
        /// Underlying I/O message.
        detail: String,
    },

    /// Reading a response failed. The session stays up.
    RxFailed {
        /// Underlying I/O message.
        detail: String,
    },
}
