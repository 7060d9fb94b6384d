//! Activity handles and the single-flight bookkeeping for background tasks.
//!
//! Each running activity is a spawned task paired with its own
//! [`CancellationToken`]. Stopping an activity cancels the token and then
//! awaits the task, so when `stop` returns the task has observed the
//! cancellation and can no longer touch the transport.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use rfctl_core::error::{Activity, Error, Result};

/// Sleep for `duration` unless `cancel` fires first.
///
/// Returns `true` if the full duration elapsed and `false` on
/// cancellation. A zero duration still yields once so a zero-dwell loop
/// cannot monopolize its worker thread.
pub(crate) async fn wait_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if duration.is_zero() {
        tokio::task::yield_now().await;
        return !cancel.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// A running background activity.
#[derive(Debug)]
pub(crate) struct ActivityHandle {
    activity: Activity,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ActivityHandle {
    /// Spawn `body` with a fresh token; the body receives a clone of it.
    pub(crate) fn spawn<F, Fut>(activity: Activity, body: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(body(cancel.clone()));
        debug!(%activity, "activity spawned");
        ActivityHandle {
            activity,
            cancel,
            task,
        }
    }

    /// Whether the task has not yet returned.
    pub(crate) fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Request cancellation and wait for the task to exit.
    pub(crate) async fn stop(self) {
        self.cancel.cancel();
        self.join().await;
    }

    /// Wait for the task to exit without requesting cancellation.
    pub(crate) async fn join(self) {
        let activity = self.activity;
        if let Err(e) = self.task.await {
            warn!(%activity, error = %e, "activity task ended abnormally");
        } else {
            debug!(%activity, "activity exited");
        }
    }
}

/// Owner of the poller and sweep handles for one controller.
///
/// At most one handle per [`Activity`] is held at a time.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    poller: Option<ActivityHandle>,
    sweep: Option<ActivityHandle>,
}

impl Lifecycle {
    fn slot(&mut self, activity: Activity) -> &mut Option<ActivityHandle> {
        match activity {
            Activity::Poller => &mut self.poller,
            Activity::Sweep => &mut self.sweep,
        }
    }

    /// Whether a task of this kind is still running.
    pub(crate) fn is_active(&self, activity: Activity) -> bool {
        let slot = match activity {
            Activity::Poller => &self.poller,
            Activity::Sweep => &self.sweep,
        };
        slot.as_ref().is_some_and(ActivityHandle::is_active)
    }

    /// Clear the slot if its task has ended, or fail with `AlreadyRunning`.
    ///
    /// `settled` tells the coordinator that the task has already published
    /// its terminal state and is merely returning; such a task is joined
    /// here instead of being reported as running.
    pub(crate) async fn reserve(&mut self, activity: Activity, settled: bool) -> Result<()> {
        let slot = self.slot(activity);
        match slot.take() {
            None => Ok(()),
            Some(handle) if !handle.is_active() || settled => {
                handle.join().await;
                Ok(())
            }
            Some(handle) => {
                *slot = Some(handle);
                Err(Error::AlreadyRunning(activity))
            }
        }
    }

    /// Record a freshly spawned handle. The slot must have been reserved.
    pub(crate) fn install(&mut self, handle: ActivityHandle) {
        let slot = self.slot(handle.activity);
        debug_assert!(slot.is_none(), "activity slot was not reserved");
        *slot = Some(handle);
    }

    /// Stop one activity. Returns `false` if nothing was running.
    pub(crate) async fn stop(&mut self, activity: Activity) -> bool {
        match self.slot(activity).take() {
            Some(handle) => {
                let was_active = handle.is_active();
                handle.stop().await;
                was_active
            }
            None => false,
        }
    }

    /// Cancel both activities, then wait for both.
    pub(crate) async fn shutdown(&mut self) {
        let poller = self.poller.take();
        let sweep = self.sweep.take();

        // Signal both before waiting on either so neither dwells while the
        // other is being joined.
        for handle in [&poller, &sweep].into_iter().flatten() {
            handle.cancel.cancel();
        }
        if let Some(handle) = poller {
            handle.join().await;
        }
        if let Some(handle) = sweep {
            handle.join().await;
        }
    }

    /// Cancel and abort both activities without waiting. For `Drop` paths,
    /// where awaiting is impossible.
    pub(crate) fn abort_all(&mut self) {
        for handle in [self.poller.take(), self.sweep.take()].into_iter().flatten() {
            handle.cancel.cancel();
            handle.task.abort();
        }
    }
}
