//! Stepped frequency sweep.
//!
//! One run walks from `start_hz` toward `stop_hz` in `step_hz` increments:
//! command the frequency, publish `Running`, dwell, advance. The run ends
//! `Completed` when the next frequency would reach or pass `stop_hz` (that
//! frequency is never commanded) or `Stopped` when cancellation is seen
//! first. The state transitions are published on a [`watch`] channel owned
//! by the controller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use rfctl_core::events::ControllerEvent;
use rfctl_core::types::{SweepParameters, SweepState};
use rfctl_line_io::CommandChannel;

use crate::builder::CommandSet;
use crate::lifecycle::wait_or_cancel;

/// Everything one sweep run needs.
pub(crate) struct SweepTask {
    pub channel: CommandChannel,
    pub params: SweepParameters,
    pub commands: CommandSet,
    pub state_tx: watch::Sender<SweepState>,
    pub event_tx: broadcast::Sender<ControllerEvent>,
    /// Raised right before the terminal state is published.
    pub settled: Arc<AtomicBool>,
}

impl SweepTask {
    /// Run to completion or cancellation. `params` must already be validated.
    pub(crate) async fn run(self, cancel: CancellationToken) {
        let params = self.params;
        info!(
            endpoint = %self.channel.endpoint(),
            %params,
            steps = params.step_count(),
            "Sweep started"
        );
        let _ = self.event_tx.send(ControllerEvent::SweepStarted { params });

        let mut index: u64 = 0;
        let mut last_hz = None;
        let mut current = params.start_hz;

        let finished = loop {
            if cancel.is_cancelled() {
                break SweepState::Stopped;
            }

            // A failed write is reported by the channel; the sweep keeps
            // its cadence rather than retrying the same frequency.
            let _ = self.channel.send(&self.commands.set_frequency(current)).await;
            last_hz = Some(current);
            self.state_tx.send_replace(SweepState::Running {
                current_hz: current,
            });
            let _ = self
                .event_tx
                .send(ControllerEvent::SweepStep { freq_hz: current });
            debug!(freq_hz = current, step = index, "sweep step");

            if !wait_or_cancel(params.dwell, &cancel).await {
                break SweepState::Stopped;
            }

            index += 1;
            current = params.frequency_at(index);
            if params.is_past_end(current) {
                break SweepState::Completed;
            }
        };

        match finished {
            SweepState::Completed => {
                info!(steps = index, "Sweep complete");
                let _ = self
                    .event_tx
                    .send(ControllerEvent::SweepCompleted { steps: index });
            }
            _ => {
                info!(last_hz = ?last_hz, "Sweep stopped");
                let _ = self.event_tx.send(ControllerEvent::SweepStopped { last_hz });
            }
        }
        self.settled.store(true, Ordering::Release);
        self.state_tx.send_replace(finished);
    }
}
