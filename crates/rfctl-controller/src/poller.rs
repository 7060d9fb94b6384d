//! Periodic status polling.
//!
//! The poller sends a fixed status query, makes one non-blocking read
//! attempt, hands any received line to the [`StatusHandler`], and waits
//! for the poll interval. Cancellation is checked before every query and
//! during every wait, so a stop request is observed within one read
//! attempt.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use rfctl_core::events::ControllerEvent;
use rfctl_core::types::ResponseLine;
use rfctl_line_io::CommandChannel;

use crate::lifecycle::wait_or_cancel;

/// Callback receiving every line the poller reads.
///
/// Device-specific parsing lives behind this trait; the controller only
/// knows that a line arrived.
pub trait StatusHandler: Send + Sync + 'static {
    fn process(&self, line: &ResponseLine);
}

/// Status handler that ignores every line.
pub struct NullStatusHandler;

impl StatusHandler for NullStatusHandler {
    fn process(&self, _line: &ResponseLine) {}
}

impl<F> StatusHandler for F
where
    F: Fn(&ResponseLine) + Send + Sync + 'static,
{
    fn process(&self, line: &ResponseLine) {
        self(line)
    }
}

/// Everything one poller run needs.
pub(crate) struct PollerTask {
    pub channel: CommandChannel,
    pub query: String,
    pub interval: Duration,
    pub handler: Arc<dyn StatusHandler>,
    pub event_tx: broadcast::Sender<ControllerEvent>,
}

impl PollerTask {
    /// Poll until cancelled.
    pub(crate) async fn run(self, cancel: CancellationToken) {
        debug!(
            endpoint = %self.channel.endpoint(),
            interval_ms = self.interval.as_millis(),
            "poller started"
        );
        let _ = self.event_tx.send(ControllerEvent::PollingStarted {
            interval: self.interval,
        });

        loop {
            if cancel.is_cancelled() {
                break;
            }

            // TxFailed / RxFailed are already logged and broadcast by the
            // channel; a failed exchange counts as "no data this cycle".
            let _ = self.channel.send(&self.query).await;
            if let Some(line) = self.channel.try_read_line().await {
                self.handler.process(&line);
                let _ = self.event_tx.send(ControllerEvent::Status { line });
            }

            if !wait_or_cancel(self.interval, &cancel).await {
                break;
            }
        }

        debug!(endpoint = %self.channel.endpoint(), "poller stopped");
        let _ = self.event_tx.send(ControllerEvent::PollingStopped);
    }
}
