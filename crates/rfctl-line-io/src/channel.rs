//! Serialized command/response channel over a shared transport.
//!
//! Every write and every read attempt takes the same exclusive guard for
//! the duration of that single call, so a command written by one activity
//! can never interleave mid-line with a read attempt from another. The
//! guard is never held across an activity's dwell or interval, so one
//! activity's slow cadence cannot starve the other.
//!
//! Once [`CommandChannel::close`] has taken the transport out, every later
//! call through any clone of the channel is a no-op: a task that is still
//! unwinding after cancellation cannot reach a closed (or a newer) handle.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tracing::{debug, trace, warn};

use rfctl_core::error::{Error, Result};
use rfctl_core::events::ControllerEvent;
use rfctl_core::transport::Transport;
use rfctl_core::types::{Endpoint, ResponseLine};

use crate::protocol;

/// Default capacity of the recent-lines buffer.
pub const DEFAULT_RECENT_CAPACITY: usize = 100;

/// Bounded FIFO of the most recent lines received; oldest evicted first.
#[derive(Debug)]
pub struct RecentLines {
    lines: VecDeque<ResponseLine>,
    capacity: usize,
}

impl RecentLines {
    /// Create an empty buffer holding at most `capacity` lines.
    ///
    /// A capacity of zero disables retention.
    pub fn new(capacity: usize) -> Self {
        RecentLines {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append a line, evicting the oldest when full.
    pub fn push(&mut self, line: ResponseLine) {
        if self.capacity == 0 {
            return;
        }
        while self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// Snapshot in arrival order, oldest first.
    pub fn to_vec(&self) -> Vec<ResponseLine> {
        self.lines.iter().cloned().collect()
    }

    /// Number of lines held.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether no lines are held.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Maximum number of lines held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// State behind the channel's guard.
struct Link {
    transport: Option<Box<dyn Transport>>,
    recent: RecentLines,
}

/// Cloneable handle serializing all I/O against one open transport.
///
/// Created per connection. Clones share the same guard, transport slot,
/// and recent-lines buffer.
#[derive(Clone)]
pub struct CommandChannel {
    link: Arc<Mutex<Link>>,
    endpoint: Endpoint,
    event_tx: broadcast::Sender<ControllerEvent>,
}

impl CommandChannel {
    /// Wrap an open transport.
    pub fn new(
        transport: Box<dyn Transport>,
        endpoint: Endpoint,
        recent_capacity: usize,
        event_tx: broadcast::Sender<ControllerEvent>,
    ) -> Self {
        CommandChannel {
            link: Arc::new(Mutex::new(Link {
                transport: Some(transport),
                recent: RecentLines::new(recent_capacity),
            })),
            endpoint,
            event_tx,
        }
    }

    /// The endpoint this channel was opened on.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Write one command line.
    ///
    /// A closed channel makes this a silent no-op. A write failure is
    /// logged, broadcast as [`ControllerEvent::TxFailed`], and returned as
    /// [`Error::TxFailed`]; the transport stays open.
    pub async fn send(&self, cmd: &str) -> Result<()> {
        let mut link = self.link.lock().await;
        let Some(transport) = link.transport.as_mut() else {
            debug!(endpoint = %self.endpoint, cmd, "send on closed channel ignored");
            return Ok(());
        };

        trace!(endpoint = %self.endpoint, cmd, "TX");
        let framed = protocol::encode_command(cmd);
        match transport.send(&framed).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let detail = e.to_string();
                warn!(endpoint = %self.endpoint, cmd, error = %detail, "TX failed");
                let _ = self.event_tx.send(ControllerEvent::TxFailed {
                    detail: detail.clone(),
                });
                Err(Error::TxFailed(detail))
            }
        }
    }

    /// Take the next received line if one is ready; never waits for data.
    ///
    /// Returns `None` when the channel is closed, no line is ready, or the
    /// read failed. A failure is logged and broadcast as
    /// [`ControllerEvent::RxFailed`]. Received lines are appended to the
    /// recent-lines buffer.
    pub async fn try_read_line(&self) -> Option<ResponseLine> {
        let mut link = self.link.lock().await;
        let result = link.transport.as_mut()?.try_read_line().await;

        match result {
            Ok(Some(text)) => {
                let line = ResponseLine::new(text);
                if line.as_str().is_empty() {
                    return None;
                }
                trace!(endpoint = %self.endpoint, line = %line, "RX");
                link.recent.push(line.clone());
                Some(line)
            }
            Ok(None) => None,
            Err(e) => {
                let detail = e.to_string();
                warn!(endpoint = %self.endpoint, error = %detail, "RX failed");
                let _ = self
                    .event_tx
                    .send(ControllerEvent::RxFailed { detail });
                None
            }
        }
    }

    /// Snapshot of the most recent received lines, oldest first.
    pub async fn recent_lines(&self) -> Vec<ResponseLine> {
        self.link.lock().await.recent.to_vec()
    }

    /// Whether the transport is still held and reports itself open.
    pub async fn is_open(&self) -> bool {
        self.link
            .lock()
            .await
            .transport
            .as_ref()
            .is_some_and(|t| t.is_connected())
    }

    /// Take the transport out and close it.
    ///
    /// Idempotent. Close errors are logged and swallowed: after this call
    /// the channel is closed regardless.
    pub async fn close(&self) {
        let taken = self.link.lock().await.transport.take();
        if let Some(mut transport) = taken {
            debug!(endpoint = %self.endpoint, "closing transport");
            if let Err(e) = transport.close().await {
                warn!(endpoint = %self.endpoint, error = %e, "error while closing transport");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
